//! Client messaging: inbox, direct replies and broadcasts

use std::sync::Arc;

use anyhow::Result;
use rusqlite::Connection;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message};

use crate::core::config::messaging::{broadcast_delay, CONVERSATION_PREVIEW, MAX_MESSAGE_LEN};
use crate::core::config::pagination::PAGE_SIZE;
use crate::core::error::AppError;
use crate::core::pagination::Page;
use crate::core::types::{format_money, MessageDirection};
use crate::storage::db::{self, DbPool};
use crate::storage::get_connection;
use crate::storage::messages::{list_conversation, save_message};
use crate::storage::orders::list_client_orders;
use crate::telegram::admin::{escape_markdown, truncate_message, user_id_of};
use crate::telegram::callbacks::Callback;
use crate::telegram::keyboards::{back_to_menu_row, button, list_header, pagination_row, View};
use crate::telegram::notifications::notify_admins;
use crate::telegram::Bot;

/// Orders shown next to the conversation when composing a reply
const RECENT_ORDERS: u32 = 3;

/// Result of delivering one message to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The client blocked the bot; they are now marked as blocked
    Blocked,
    Failed(String),
}

/// Totals of a finished broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: u32,
    pub failed: u32,
    pub blocked: u32,
}

impl BroadcastReport {
    pub fn record(&mut self, delivery: &Delivery) {
        match delivery {
            Delivery::Delivered => self.sent += 1,
            Delivery::Blocked => self.blocked += 1,
            Delivery::Failed(_) => self.failed += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "📢 Рассылка завершена\n\n✅ Доставлено: {}\n🚫 Заблокировали бота: {}\n❌ Ошибки: {}",
            self.sent, self.blocked, self.failed
        )
    }
}

/// Parses `/send` arguments: `<client_id> <text>`.
///
/// The text may be empty, in which case the admin is asked for it.
pub fn parse_send_args(args: &str) -> Option<(i64, String)> {
    let args = args.trim();
    let (id, text) = match args.split_once(char::is_whitespace) {
        Some((id, text)) => (id, text.trim()),
        None => (args, ""),
    };
    let id = id.parse().ok()?;
    Some((id, text.to_string()))
}

/// Text of a message for the conversation log; media gets a placeholder
fn loggable_text(msg: &Message) -> String {
    if let Some(text) = msg.text().or_else(|| msg.caption()) {
        return text.to_string();
    }
    if msg.photo().is_some() {
        "[фото]".to_string()
    } else if msg.sticker().is_some() {
        "[стикер]".to_string()
    } else if msg.voice().is_some() {
        "[голосовое]".to_string()
    } else {
        "[вложение]".to_string()
    }
}

/// Handles any message from a non-admin: registers the client, logs the
/// message and forwards it to every admin with a reply button.
pub async fn handle_client_message(bot: &Bot, msg: &Message, db_pool: &Arc<DbPool>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let client_id = user_id_of(user);
    let body = loggable_text(msg);

    let display_name = {
        let conn = get_connection(db_pool)?;
        db::upsert_client(&conn, client_id, user.username.as_deref(), Some(user.first_name.as_str()))?;
        save_message(&conn, client_id, MessageDirection::Incoming, &body, None, true)?;
        db::get_client(&conn, client_id)?
            .map(|c| c.display_name())
            .unwrap_or_else(|| format!("ID:{}", client_id))
    };

    let text = truncate_message(&format!(
        "✉️ Сообщение от {} (ID {}):\n\n{}",
        display_name, client_id, body
    ));
    let reply = vec![vec![button("✉️ Ответить", Callback::ClientMessage { id: client_id })]];
    notify_admins(bot, &text, Some(reply)).await;

    bot.send_message(msg.chat.id, "✅ Сообщение передано менеджеру, ответ придёт сюда.")
        .await?;
    Ok(())
}

/// Sends `text` to a client and logs it as outgoing.
///
/// A client who blocked the bot is marked as blocked so broadcasts skip them.
pub async fn deliver(bot: &Bot, db_pool: &Arc<DbPool>, admin_id: Option<i64>, client_id: i64, text: &str) -> Result<Delivery> {
    let delivery = match bot.send_message(ChatId(client_id), text).await {
        Ok(_) => Delivery::Delivered,
        Err(e) => {
            let err = AppError::from(e);
            if err.is_forbidden() {
                Delivery::Blocked
            } else {
                Delivery::Failed(err.to_string())
            }
        }
    };

    let conn = get_connection(db_pool)?;
    if delivery == Delivery::Blocked {
        db::set_client_blocked(&conn, client_id, true)?;
        log::warn!("🚫 Client {} blocked the bot", client_id);
    }
    if let Delivery::Failed(reason) = &delivery {
        log::error!("❌ Failed to deliver message to {}: {}", client_id, reason);
    }
    save_message(
        &conn,
        client_id,
        MessageDirection::Outgoing,
        text,
        admin_id,
        delivery == Delivery::Delivered,
    )?;
    Ok(delivery)
}

/// Delivers an admin's message and reports the outcome in the admin chat
pub async fn send_to_client(bot: &Bot, db_pool: &Arc<DbPool>, admin_chat: ChatId, admin_id: i64, client_id: i64, text: &str) -> Result<()> {
    if text.chars().count() > MAX_MESSAGE_LEN {
        bot.send_message(admin_chat, format!("❌ Сообщение длиннее {} символов", MAX_MESSAGE_LEN))
            .await?;
        return Ok(());
    }
    let known = {
        let conn = get_connection(db_pool)?;
        db::get_client(&conn, client_id)?.is_some()
    };
    if !known {
        bot.send_message(admin_chat, format!("❌ Клиент {} не найден", client_id))
            .await?;
        return Ok(());
    }

    let reply = match deliver(bot, db_pool, Some(admin_id), client_id, text).await? {
        Delivery::Delivered => "✅ Сообщение доставлено".to_string(),
        Delivery::Blocked => "🚫 Клиент заблокировал бота, сообщение не доставлено".to_string(),
        Delivery::Failed(reason) => format!("❌ Не удалось отправить: {}", reason),
    };
    bot.send_message(admin_chat, reply).await?;
    Ok(())
}

/// Sends `text` to every reachable client, one by one with a pause between messages
pub async fn broadcast(bot: &Bot, db_pool: &Arc<DbPool>, text: &str) -> Result<BroadcastReport> {
    let recipients = {
        let conn = get_connection(db_pool)?;
        db::list_reachable_client_ids(&conn)?
    };
    log::info!("📢 Broadcast to {} clients started", recipients.len());

    let mut report = BroadcastReport::default();
    for client_id in recipients {
        let delivery = match deliver(bot, db_pool, None, client_id, text).await {
            Ok(delivery) => delivery,
            Err(e) => {
                log::error!("❌ Broadcast to {} not recorded: {:#}", client_id, e);
                Delivery::Failed(e.to_string())
            }
        };
        report.record(&delivery);
        tokio::time::sleep(broadcast_delay()).await;
    }

    log::info!(
        "📢 Broadcast finished: sent={}, blocked={}, failed={}",
        report.sent,
        report.blocked,
        report.failed
    );
    Ok(report)
}

/// Runs a broadcast in the background and posts the report to `admin_chat`
pub fn spawn_broadcast(bot: Bot, db_pool: Arc<DbPool>, admin_chat: ChatId, text: String) {
    tokio::spawn(async move {
        let summary = match broadcast(&bot, &db_pool, &text).await {
            Ok(report) => report.summary(),
            Err(e) => {
                log::error!("❌ Broadcast aborted: {}", e);
                format!("❌ Рассылка прервана: {}", e)
            }
        };
        if let Err(e) = bot.send_message(admin_chat, summary).await {
            log::error!("Failed to send broadcast report: {}", e);
        }
    });
}

/// Preview asking the admin to confirm a broadcast
pub fn broadcast_confirm_view(conn: &Connection, text: &str) -> Result<View> {
    let recipients = db::count_clients(conn, true)?;
    Ok(View::new(
        format!(
            "📢 *Рассылка* для {} клиентов:\n\n{}",
            recipients,
            escape_markdown(text)
        ),
        vec![vec![
            button("✅ Отправить", Callback::BroadcastConfirm),
            button("🚫 Отмена", Callback::BroadcastCancel),
        ]],
    ))
}

pub fn clients_view(conn: &Connection, page: u32) -> Result<View> {
    let page = Page::clamp(page, db::count_clients(conn, false)?, *PAGE_SIZE);
    let clients = db::list_clients(conn, &page)?;

    let mut text = list_header("👥 Клиенты", &page);
    if clients.is_empty() {
        text.push_str("\n\nКлиентов пока нет\\.");
    }
    let mut rows = Vec::new();
    for client in &clients {
        text.push_str(&format!(
            "\n\n{} {} `{}`\n    был\\(а\\): {}",
            if client.is_blocked { "🚫" } else { "👤" },
            escape_markdown(&client.display_name()),
            client.telegram_id,
            escape_markdown(&client.last_seen_at)
        ));
        if !client.is_blocked {
            rows.push(vec![button(
                format!("✉️ {}", client.display_name()),
                Callback::ClientMessage { id: client.telegram_id },
            )]);
        }
    }
    if page.total_pages() > 1 {
        rows.push(pagination_row(&page, |p| Callback::ClientList { page: p }));
    }
    rows.push(back_to_menu_row());
    Ok(View::new(text, rows))
}

/// Recent conversation shown when the admin starts writing to a client
pub fn compose_view(conn: &Connection, client_id: i64) -> Result<View> {
    let name = db::get_client(conn, client_id)?
        .map(|c| c.display_name())
        .unwrap_or_else(|| format!("ID:{}", client_id));
    let history = list_conversation(conn, client_id, CONVERSATION_PREVIEW)?;

    let mut text = format!("✉️ *Сообщение для {}*", escape_markdown(&name));
    if !history.is_empty() {
        text.push_str("\n\nПоследние сообщения:");
        for message in &history {
            let arrow = match message.direction {
                MessageDirection::Incoming => "⬅️",
                MessageDirection::Outgoing => "➡️",
            };
            let body: String = message.body.chars().take(200).collect();
            text.push_str(&format!("\n{} {}", arrow, escape_markdown(&body)));
        }
    }
    let orders = list_client_orders(conn, client_id, RECENT_ORDERS)?;
    if !orders.is_empty() {
        text.push_str("\n\nПоследние заказы:");
        for order in &orders {
            let line = format!("🧾 №{} · {} · {}", order.id, order.status, format_money(order.total));
            text.push_str(&format!("\n{}", escape_markdown(&line)));
        }
    }
    text.push_str("\n\nНапиши текст ответа или /cancel\\.");
    Ok(View::new(text, vec![back_to_menu_row()]))
}
