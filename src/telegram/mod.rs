//! Telegram bot integration and handlers

pub mod actions;
pub mod admin;
pub mod bot;
pub mod callbacks;
pub mod dialogue;
pub mod handlers;
pub mod keyboards;
pub mod messaging;
pub mod notifications;
pub mod products;
pub mod promo;
pub mod stats;

pub use teloxide::Bot;

// Re-exports for convenience
pub use admin::{escape_markdown, is_admin};
pub use bot::{create_bot, setup_bot_commands, Command};
pub use callbacks::Callback;
pub use dialogue::{DialogueStorage, ShopDialogue, State};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use messaging::BroadcastReport;
