//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A summary of the resolved configuration, logged once at startup

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// The log file is opened in append mode so restarts keep the history.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to open the file or a logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file: {}", e))?;

    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            log_config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the resolved configuration at application startup
///
/// Secrets (the bot token) are never printed, only whether they are present.
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🛒 shopdesk configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Database: {}", config::DATABASE_PATH.as_str());
    log::info!("Backups:  {}", config::BACKUP_DIR.as_str());
    log::info!("Page size: {}", *config::pagination::PAGE_SIZE);
    if *config::network::DROP_PENDING_UPDATES {
        log::info!("Pending updates are dropped on start");
    }

    if config::BOT_TOKEN.is_empty() {
        log::error!("❌ BOT_TOKEN is not set");
    } else {
        log::info!("✅ BOT_TOKEN is set");
    }

    match config::BOT_API_URL.as_deref() {
        Some(url) => log::info!("Bot API: {}", url),
        None => log::info!("Bot API: official (api.telegram.org)"),
    }

    let admins = config::admin::ADMIN_IDS.len();
    if admins == 0 {
        log::error!("❌ ADMIN_IDS is empty - nobody will be able to use admin commands!");
    } else {
        log::info!("✅ {} admin(s) configured", admins);
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
