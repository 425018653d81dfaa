//! shopdesk - admin side of a Telegram shop bot
//!
//! Promo codes, actions (time-boxed campaigns), product images, client
//! messaging and sales statistics over SQLite.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and domain rules
//! - `storage`: Database pool, migrations, queries and backups
//! - `telegram`: Bot commands, dialogue, keyboards and handlers
//! - `cli`: Command line interface

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
