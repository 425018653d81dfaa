//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::Message;

use crate::storage::db;
use crate::telegram::admin::{is_admin, user_id_of};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub bot_username: Option<String>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<db::DbPool>, bot_username: Option<String>) -> Self {
        Self { db_pool, bot_username }
    }
}

/// Telegram ID of the message author, 0 for channel posts
pub fn sender_id(msg: &Message) -> i64 {
    msg.from.as_ref().map(user_id_of).unwrap_or(0)
}

pub fn is_admin_message(msg: &Message) -> bool {
    is_admin(sender_id(msg))
}

/// Private chat with a real user (not a bot)
pub fn is_client_chat(msg: &Message) -> bool {
    msg.chat.is_private() && msg.from.as_ref().is_some_and(|u| !u.is_bot)
}
