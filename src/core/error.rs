use thiserror::Error;

use crate::core::validation::ValidationError;

/// Centralized error types for the application
///
/// Storage helpers return `rusqlite::Result` or their own module errors; anything
/// that crosses into the bot layer is converted into this enum.
///
/// # Example
///
/// ```no_run
/// use shopdesk::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid admin input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the bot was blocked or kicked by the recipient
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked))
                | AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::UserDeactivated))
                | AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::BotKicked))
                | AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::ChatNotFound))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts() {
        let err: AppError = ValidationError::Empty.into();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().starts_with("Validation error"));
    }

    #[test]
    fn test_blocked_is_forbidden() {
        let err = AppError::Telegram(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked));
        assert!(err.is_forbidden());
        assert!(!AppError::NotFound("client 1".into()).is_forbidden());
    }
}
