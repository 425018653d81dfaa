//! Update routing: commands, dialogue input, the client inbox and inline buttons
//!
//! [`schema`] builds the one handler tree used by the dispatcher and by tests.

mod commands;
mod input;
mod schema;
mod types;

pub use schema::schema;
pub use types::{is_admin_message, is_client_chat, sender_id, HandlerDeps, HandlerError};
