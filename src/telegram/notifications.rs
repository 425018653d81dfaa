use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config::admin::{ADMIN_IDS, ADMIN_USER_ID};
use crate::telegram::Bot;

/// Chats that receive admin notifications: every `ADMIN_IDS` entry, or `ADMIN_USER_ID` alone
pub fn admin_chats() -> Vec<ChatId> {
    if !ADMIN_IDS.is_empty() {
        return ADMIN_IDS.iter().map(|id| ChatId(*id)).collect();
    }
    if *ADMIN_USER_ID != 0 {
        return vec![ChatId(*ADMIN_USER_ID)];
    }
    Vec::new()
}

/// Sends a plain-text notification to every admin.
///
/// Delivery failures are logged and never propagated: a missing admin chat
/// must not break the handler that triggered the notification.
pub async fn notify_admins(bot: &Bot, text: &str, keyboard: Option<Vec<Vec<InlineKeyboardButton>>>) {
    let chats = admin_chats();
    if chats.is_empty() {
        log::warn!("No admins configured, notification dropped");
        return;
    }

    for chat_id in chats {
        let mut request = bot.send_message(chat_id, text);
        if let Some(rows) = &keyboard {
            request = request.reply_markup(InlineKeyboardMarkup::new(rows.clone()));
        }
        if let Err(e) = request.await {
            log::error!("Failed to send admin notification to {}: {}", chat_id, e);
        }
    }
}

/// Tells the admins the bot has (re)started
pub async fn notify_admin_startup(bot: &Bot, bot_username: Option<&str>) {
    let name = bot_username
        .map(|u| format!("@{}", u))
        .unwrap_or_else(|| "бот".to_string());
    notify_admins(
        bot,
        &format!("🚀 {} запущен (v{})\n\n/start открывает панель магазина", name, env!("CARGO_PKG_VERSION")),
        None,
    )
    .await;
}
