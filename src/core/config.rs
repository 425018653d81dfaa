use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: shop.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "shop.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: shopdesk.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "shopdesk.log".to_string()));

/// Directory for database backups created by /backup
/// Read from BACKUP_DIR environment variable
/// Default: backups
pub static BACKUP_DIR: Lazy<String> = Lazy::new(|| env::var("BACKUP_DIR").unwrap_or_else(|_| "backups".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Optional custom Bot API server (local telegram-bot-api)
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Admin access configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    pub(crate) fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Admin user ID for direct notifications
    /// Read from ADMIN_USER_ID or fallback to first ADMIN_IDS entry
    /// Defaults to 0 if not set (no admin notifications)
    pub static ADMIN_USER_ID: Lazy<i64> = Lazy::new(|| {
        env::var("ADMIN_USER_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .or_else(|| ADMIN_IDS.first().copied())
            .unwrap_or(0)
    });
}

/// List pagination
pub mod pagination {
    use once_cell::sync::Lazy;
    use std::env;

    pub const DEFAULT_PAGE_SIZE: u32 = 5;
    pub const MAX_PAGE_SIZE: u32 = 20;

    /// Items per page in admin lists
    /// Read from PAGE_SIZE environment variable, clamped to 1..=20
    pub static PAGE_SIZE: Lazy<u32> = Lazy::new(|| {
        env::var("PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|size| size.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    });
}

/// Promo code and action constraints
pub mod promo {
    pub const CODE_MIN_LEN: usize = 3;
    pub const CODE_MAX_LEN: usize = 32;

    pub const MIN_DISCOUNT_PERCENT: u8 = 1;
    pub const MAX_DISCOUNT_PERCENT: u8 = 95;

    /// Maximum length of an action title
    pub const TITLE_MAX_LEN: usize = 64;

    /// Maximum length of an action description
    pub const DESCRIPTION_MAX_LEN: usize = 1024;
}

/// Client messaging configuration
pub mod messaging {
    use super::Duration;

    /// Pause between broadcast messages (Telegram allows ~30 msg/s per bot)
    pub const BROADCAST_DELAY_MS: u64 = 50;

    /// Maximum length of a message body sent to a client
    pub const MAX_MESSAGE_LEN: usize = 4000;

    /// Number of messages shown in a conversation preview
    pub const CONVERSATION_PREVIEW: u32 = 5;

    pub fn broadcast_delay() -> Duration {
        Duration::from_millis(BROADCAST_DELAY_MS)
    }
}

/// Statistics configuration
pub mod stats {
    /// Number of products shown in the top list
    pub const TOP_PRODUCTS: u32 = 5;

    /// Number of days drawn in the activity chart
    pub const CHART_DAYS: usize = 14;
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Base for exponential backoff calculation
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
}

/// Network configuration
pub mod network {
    use super::Duration;
    use once_cell::sync::Lazy;
    use std::env;

    /// Skip updates that queued up while the bot was offline
    /// Read from DROP_PENDING_UPDATES environment variable
    /// Default: false (client messages sent during downtime still reach the inbox)
    pub static DROP_PENDING_UPDATES: Lazy<bool> =
        Lazy::new(|| drop_pending_from(env::var("DROP_PENDING_UPDATES").ok().as_deref()));

    pub(crate) fn drop_pending_from(raw: Option<&str>) -> bool {
        raw.and_then(|v| v.trim().parse().ok()).unwrap_or(false)
    }

    /// Request timeout for Bot API requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::admin::parse_admin_ids;
    use super::network::drop_pending_from;

    #[test]
    fn test_parse_admin_ids_mixed_separators() {
        assert_eq!(parse_admin_ids("1, 2 3\n4"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_admin_ids_skips_garbage() {
        assert_eq!(parse_admin_ids("abc,42,,-7"), vec![42, -7]);
        assert!(parse_admin_ids("").is_empty());
    }

    #[test]
    fn pending_updates_kept_unless_asked() {
        assert!(!drop_pending_from(None));
        assert!(!drop_pending_from(Some("yes")));
        assert!(!drop_pending_from(Some("false")));
        assert!(drop_pending_from(Some(" true ")));
    }
}
