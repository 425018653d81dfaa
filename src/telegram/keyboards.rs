//! Inline keyboards and the message views they belong to

use anyhow::Result;
use rusqlite::Connection;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};

use crate::core::pagination::Page;
use crate::core::types::{today, StatsPeriod};
use crate::storage::{actions, db, messages, products, promo};
use crate::telegram::admin::{clamp_markdown, escape_markdown};
use crate::telegram::callbacks::Callback;
use crate::telegram::Bot;

/// A MarkdownV2 message together with its inline keyboard
#[derive(Debug, Clone)]
pub struct View {
    pub text: String,
    pub markup: InlineKeyboardMarkup,
}

impl View {
    /// `text` must already be MarkdownV2; it is cut to fit one message
    pub fn new(text: impl Into<String>, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self {
            text: clamp_markdown(&text.into()),
            markup: InlineKeyboardMarkup::new(rows),
        }
    }
}

pub fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, callback.data())
}

/// `◀️ 2/5 ▶️` row; arrows at the ends are inert
pub fn pagination_row(page: &Page, to_page: impl Fn(u32) -> Callback) -> Vec<InlineKeyboardButton> {
    let prev = if page.has_prev() {
        button("◀️", to_page(page.page - 1))
    } else {
        button("·", Callback::Noop)
    };
    let next = if page.has_next() {
        button("▶️", to_page(page.page + 1))
    } else {
        button("·", Callback::Noop)
    };
    vec![prev, button(page.label(), Callback::Noop), next]
}

pub fn back_to_menu_row() -> Vec<InlineKeyboardButton> {
    vec![button("🏠 Меню", Callback::Menu)]
}

/// Yes/no row used before destructive actions
pub fn confirm_row(yes: Callback, no: Callback) -> Vec<InlineKeyboardButton> {
    vec![button("✅ Да, удалить", yes), button("↩️ Нет", no)]
}

/// Admin dashboard with a few counters
pub fn main_menu_view(conn: &Connection) -> Result<View> {
    let today = today();
    let clients = db::count_clients(conn, false)?;
    let reachable = db::count_clients(conn, true)?;
    let promos = promo::count_promos(conn)?;
    let running = actions::list_running_actions(conn, today)?.len();
    let without_image = products::count_products_without_image(conn)?;
    let since = (today - chrono::Duration::days(7)).format("%Y-%m-%d 00:00:00").to_string();
    let unanswered = messages::count_unanswered(conn, &since)?;

    let text = format!(
        "🛒 *Панель магазина*\n\n\
         👥 Клиенты: {} \\(доступны: {}\\)\n\
         🎟 Промокоды: {}\n\
         📣 Идущие акции: {}\n\
         📷 Товары без фото: {}\n\
         ✉️ Ждут ответа: {}",
        clients, reachable, promos, running, without_image, unanswered
    );

    let rows = vec![
        vec![
            button("🎟 Промокоды", Callback::PromoList { page: 0 }),
            button("📣 Акции", Callback::ActionList { page: 0 }),
        ],
        vec![
            button("🛍 Товары", Callback::ProductList { page: 0 }),
            button("👥 Клиенты", Callback::ClientList { page: 0 }),
        ],
        vec![button("📊 Статистика", Callback::Stats(StatsPeriod::Week))],
    ];
    Ok(View::new(text, rows))
}

/// Header line of a paginated list: `*Title* (2/3, всего 12)`
pub fn list_header(title: &str, page: &Page) -> String {
    format!(
        "*{}* \\({}, всего {}\\)",
        escape_markdown(title),
        escape_markdown(&page.label()),
        page.total_items
    )
}

pub async fn send_view(bot: &Bot, chat_id: ChatId, view: View) -> Result<()> {
    bot.send_message(chat_id, view.text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(view.markup)
        .await?;
    Ok(())
}

/// Redraws a message in place; an unchanged view is not an error
pub async fn edit_view(bot: &Bot, chat_id: ChatId, message_id: MessageId, view: View) -> Result<()> {
    let result = bot
        .edit_message_text(chat_id, message_id, view.text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(view.markup)
        .await;
    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
