//! Inline button payloads and the callback query router
//!
//! Telegram limits `callback_data` to 64 bytes, so every button carries a short
//! colon-separated string such as `promo:toggle:7:2` (toggle promo 7, then
//! redraw page 2).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, MessageId};

use crate::core::types::{today, StatsPeriod};
use crate::storage::db::DbPool;
use crate::storage::get_connection;
use crate::telegram::admin::{is_admin, user_id_of, ACCESS_DENIED};
use crate::telegram::dialogue::{ShopDialogue, State};
use crate::telegram::keyboards::{edit_view, main_menu_view, send_view, View};
use crate::telegram::{actions, messaging, products, promo, stats, Bot};

/// Telegram's limit on `callback_data`
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu,
    /// Inert button (page counter, disabled arrows)
    Noop,

    PromoList { page: u32 },
    PromoNew,
    PromoToggle { id: i64, page: u32 },
    PromoDelete { id: i64, page: u32 },
    PromoDeleteConfirm { id: i64, page: u32 },

    ActionList { page: u32 },
    ActionNew,
    ActionToggle { id: i64, page: u32 },
    ActionDelete { id: i64, page: u32 },
    ActionDeleteConfirm { id: i64, page: u32 },
    ActionImage { id: i64 },
    ActionProducts { id: i64, page: u32 },
    ActionLink { id: i64, product_id: i64, page: u32 },

    ProductList { page: u32 },
    ProductImage { id: i64 },
    ProductImageClear { id: i64, page: u32 },

    ClientList { page: u32 },
    ClientMessage { id: i64 },

    Stats(StatsPeriod),
    StatsCustom,

    BroadcastConfirm,
    BroadcastCancel,
}

/// Unparseable or unknown callback data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown callback data: {0}")]
pub struct UnknownCallback(pub String);

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Menu => write!(f, "menu"),
            Callback::Noop => write!(f, "noop"),

            Callback::PromoList { page } => write!(f, "promo:list:{}", page),
            Callback::PromoNew => write!(f, "promo:new"),
            Callback::PromoToggle { id, page } => write!(f, "promo:toggle:{}:{}", id, page),
            Callback::PromoDelete { id, page } => write!(f, "promo:del:{}:{}", id, page),
            Callback::PromoDeleteConfirm { id, page } => write!(f, "promo:delok:{}:{}", id, page),

            Callback::ActionList { page } => write!(f, "act:list:{}", page),
            Callback::ActionNew => write!(f, "act:new"),
            Callback::ActionToggle { id, page } => write!(f, "act:toggle:{}:{}", id, page),
            Callback::ActionDelete { id, page } => write!(f, "act:del:{}:{}", id, page),
            Callback::ActionDeleteConfirm { id, page } => write!(f, "act:delok:{}:{}", id, page),
            Callback::ActionImage { id } => write!(f, "act:img:{}", id),
            Callback::ActionProducts { id, page } => write!(f, "act:prods:{}:{}", id, page),
            Callback::ActionLink { id, product_id, page } => write!(f, "act:link:{}:{}:{}", id, product_id, page),

            Callback::ProductList { page } => write!(f, "prod:list:{}", page),
            Callback::ProductImage { id } => write!(f, "prod:img:{}", id),
            Callback::ProductImageClear { id, page } => write!(f, "prod:imgdel:{}:{}", id, page),

            Callback::ClientList { page } => write!(f, "cli:list:{}", page),
            Callback::ClientMessage { id } => write!(f, "cli:msg:{}", id),

            Callback::Stats(period) => write!(f, "stats:{}", period.key().unwrap_or("week")),
            Callback::StatsCustom => write!(f, "stats:custom"),

            Callback::BroadcastConfirm => write!(f, "bc:ok"),
            Callback::BroadcastCancel => write!(f, "bc:no"),
        }
    }
}

impl FromStr for Callback {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(data.to_string());
        let parts: Vec<&str> = data.split(':').collect();

        let id = |idx: usize| -> Result<i64, UnknownCallback> {
            parts.get(idx).and_then(|s| s.parse().ok()).ok_or_else(unknown)
        };
        let page = |idx: usize| -> Result<u32, UnknownCallback> {
            parts.get(idx).and_then(|s| s.parse().ok()).ok_or_else(unknown)
        };

        let callback = match parts.as_slice() {
            ["menu"] => Callback::Menu,
            ["noop"] => Callback::Noop,

            ["promo", "list", _] => Callback::PromoList { page: page(2)? },
            ["promo", "new"] => Callback::PromoNew,
            ["promo", "toggle", _, _] => Callback::PromoToggle {
                id: id(2)?,
                page: page(3)?,
            },
            ["promo", "del", _, _] => Callback::PromoDelete {
                id: id(2)?,
                page: page(3)?,
            },
            ["promo", "delok", _, _] => Callback::PromoDeleteConfirm {
                id: id(2)?,
                page: page(3)?,
            },

            ["act", "list", _] => Callback::ActionList { page: page(2)? },
            ["act", "new"] => Callback::ActionNew,
            ["act", "toggle", _, _] => Callback::ActionToggle {
                id: id(2)?,
                page: page(3)?,
            },
            ["act", "del", _, _] => Callback::ActionDelete {
                id: id(2)?,
                page: page(3)?,
            },
            ["act", "delok", _, _] => Callback::ActionDeleteConfirm {
                id: id(2)?,
                page: page(3)?,
            },
            ["act", "img", _] => Callback::ActionImage { id: id(2)? },
            ["act", "prods", _, _] => Callback::ActionProducts {
                id: id(2)?,
                page: page(3)?,
            },
            ["act", "link", _, _, _] => Callback::ActionLink {
                id: id(2)?,
                product_id: id(3)?,
                page: page(4)?,
            },

            ["prod", "list", _] => Callback::ProductList { page: page(2)? },
            ["prod", "img", _] => Callback::ProductImage { id: id(2)? },
            ["prod", "imgdel", _, _] => Callback::ProductImageClear {
                id: id(2)?,
                page: page(3)?,
            },

            ["cli", "list", _] => Callback::ClientList { page: page(2)? },
            ["cli", "msg", _] => Callback::ClientMessage { id: id(2)? },

            ["stats", "custom"] => Callback::StatsCustom,
            ["stats", key] => Callback::Stats(StatsPeriod::from_key(key).ok_or_else(unknown)?),

            ["bc", "ok"] => Callback::BroadcastConfirm,
            ["bc", "no"] => Callback::BroadcastCancel,

            _ => return Err(unknown()),
        };
        Ok(callback)
    }
}

impl Callback {
    /// Payload for `InlineKeyboardButton::callback`
    pub fn data(&self) -> String {
        self.to_string()
    }
}

/// Handles a press on an inline button.
///
/// Always answers the query so the client stops the loading spinner; list
/// views are redrawn in place by editing the originating message.
pub async fn route_callback(bot: Bot, q: CallbackQuery, dialogue: ShopDialogue, db_pool: Arc<DbPool>) -> Result<()> {
    let user_id = user_id_of(&q.from);
    let data = q.data.clone().unwrap_or_default();

    if !is_admin(user_id) {
        bot.answer_callback_query(q.id.clone()).text(ACCESS_DENIED).await?;
        return Ok(());
    }

    let callback = match data.parse::<Callback>() {
        Ok(callback) => callback,
        Err(e) => {
            log::warn!("⚠️ {} (user {})", e, user_id);
            bot.answer_callback_query(q.id.clone()).text("Кнопка устарела").await?;
            return Ok(());
        }
    };

    let Some(message) = q.regular_message() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat.id;
    let message_id = message.id;
    log::info!("🔘 Callback {:?} from admin {}", callback, user_id);

    let notice = handle_callback(&bot, chat_id, message_id, callback, &dialogue, &db_pool).await?;

    match notice {
        Some(text) => bot.answer_callback_query(q.id.clone()).text(text).show_alert(true).await?,
        None => bot.answer_callback_query(q.id.clone()).await?,
    };
    Ok(())
}

/// What a button press turns into once the database work is done
#[derive(Debug)]
pub enum Reaction {
    /// Nothing to redraw
    Nothing,
    /// Redraw the originating message, optionally with an alert
    Edit { view: View, notice: Option<String> },
    /// Open a chat with a client: new message plus the compose state
    Compose { client_id: i64, view: View },
    /// Switch to an input state and ask its question
    Input(State),
}

/// Runs the database side of a callback.
///
/// Broadcast buttons only touch the dialogue and are answered by the caller.
pub fn apply_callback(conn: &Connection, callback: Callback, today: NaiveDate) -> Result<Reaction> {
    let edit = |view: View| Reaction::Edit { view, notice: None };

    let reaction = match callback {
        Callback::Noop | Callback::BroadcastConfirm | Callback::BroadcastCancel => Reaction::Nothing,
        Callback::Menu => edit(main_menu_view(conn)?),

        Callback::PromoList { page } => edit(promo::list_view(conn, page, today)?),
        Callback::PromoNew => Reaction::Input(State::PromoCode),
        Callback::PromoToggle { id, page } => {
            let notice = promo::toggle(conn, id)?;
            Reaction::Edit {
                view: promo::list_view(conn, page, today)?,
                notice,
            }
        }
        Callback::PromoDelete { id, page } => edit(promo::confirm_delete_view(conn, id, page)?),
        Callback::PromoDeleteConfirm { id, page } => {
            let notice = promo::delete(conn, id)?;
            Reaction::Edit {
                view: promo::list_view(conn, page, today)?,
                notice,
            }
        }

        Callback::ActionList { page } => edit(actions::list_view(conn, page, today)?),
        Callback::ActionNew => Reaction::Input(State::ActionTitle),
        Callback::ActionToggle { id, page } => {
            let notice = actions::toggle(conn, id)?;
            Reaction::Edit {
                view: actions::list_view(conn, page, today)?,
                notice,
            }
        }
        Callback::ActionDelete { id, page } => edit(actions::confirm_delete_view(conn, id, page)?),
        Callback::ActionDeleteConfirm { id, page } => {
            let notice = actions::delete(conn, id)?;
            Reaction::Edit {
                view: actions::list_view(conn, page, today)?,
                notice,
            }
        }
        Callback::ActionImage { id } => Reaction::Input(State::ActionImageReplace { action_id: id }),
        Callback::ActionProducts { id, page } => edit(actions::products_view(conn, id, page)?),
        Callback::ActionLink { id, product_id, page } => {
            actions::toggle_product(conn, id, product_id)?;
            edit(actions::products_view(conn, id, page)?)
        }

        Callback::ProductList { page } => edit(products::list_view(conn, page)?),
        Callback::ProductImage { id } => Reaction::Input(State::ProductImage { product_id: id }),
        Callback::ProductImageClear { id, page } => {
            crate::storage::products::clear_product_image(conn, id)?;
            edit(products::list_view(conn, page)?)
        }

        Callback::ClientList { page } => edit(messaging::clients_view(conn, page)?),
        Callback::ClientMessage { id } => Reaction::Compose {
            client_id: id,
            view: messaging::compose_view(conn, id)?,
        },

        Callback::Stats(period) => edit(stats::stats_view(conn, period, today)?),
        Callback::StatsCustom => Reaction::Input(State::StatsFrom),
    };
    Ok(reaction)
}

/// Performs the callback; returns an alert text when the admin should be told something
async fn handle_callback(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    callback: Callback,
    dialogue: &ShopDialogue,
    db_pool: &Arc<DbPool>,
) -> Result<Option<String>> {
    match callback {
        Callback::BroadcastConfirm => {
            let text = match dialogue.get().await? {
                Some(State::BroadcastConfirm { text }) => text,
                _ => return Ok(Some("Рассылка уже отправлена или отменена".to_string())),
            };
            dialogue.exit().await?;
            bot.edit_message_text(chat_id, message_id, "📢 Рассылка запущена…").await?;
            messaging::spawn_broadcast(bot.clone(), Arc::clone(db_pool), chat_id, text);
            return Ok(None);
        }
        Callback::BroadcastCancel => {
            dialogue.exit().await?;
            bot.edit_message_text(chat_id, message_id, "🚫 Рассылка отменена").await?;
            return Ok(None);
        }
        Callback::Menu => dialogue.exit().await?,
        _ => {}
    }

    let reaction = {
        let conn = get_connection(db_pool)?;
        apply_callback(&conn, callback, today())?
    };

    match reaction {
        Reaction::Nothing => {}
        Reaction::Edit { view, notice } => {
            edit_view(bot, chat_id, message_id, view).await?;
            return Ok(notice);
        }
        Reaction::Compose { client_id, view } => {
            dialogue.update(State::MessageClient { client_id }).await?;
            send_view(bot, chat_id, view).await?;
        }
        Reaction::Input(state) => start_input(bot, chat_id, dialogue, state).await?,
    }
    Ok(None)
}

/// Switches the dialogue to an input state and asks its question
pub async fn start_input(bot: &Bot, chat_id: ChatId, dialogue: &ShopDialogue, state: State) -> Result<()> {
    let prompt = state.prompt();
    dialogue.update(state).await?;
    bot.send_message(chat_id, format!("{}\n\n/cancel для отмены", prompt)).await?;
    Ok(())
}
