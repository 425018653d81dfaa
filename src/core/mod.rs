//! Core utilities, configuration, and domain rules (no Telegram, no SQL)

pub mod config;
pub mod error;
pub mod logging;
pub mod pagination;
pub mod promo;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use pagination::Page;
pub use types::{format_money, today, OrderStatus, StatsPeriod};
