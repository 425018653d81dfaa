//! Command handler implementations

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use super::types::{sender_id, HandlerDeps};
use crate::core::types::{today, StatsPeriod};
use crate::storage::{db, get_connection};
use crate::telegram::admin::{handle_backup_command, is_admin};
use crate::telegram::bot::Command;
use crate::telegram::callbacks::start_input;
use crate::telegram::dialogue::{ShopDialogue, State};
use crate::telegram::keyboards::{main_menu_view, send_view};
use crate::telegram::{actions, messaging, products, promo, stats, Bot};

const SEND_USAGE: &str = "Использование: /send <id клиента> <текст>\nID видно в списке /clients.";

/// Handle /start from a client: register them and explain how to reach the shop
pub(super) async fn handle_client_start(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    {
        let conn = get_connection(&deps.db_pool)?;
        db::upsert_client(&conn, sender_id(msg), user.username.as_deref(), Some(user.first_name.as_str()))?;
    }
    bot.send_message(
        msg.chat.id,
        format!(
            "👋 Привет, {}!\n\nНапиши сюда вопрос о заказе или товаре, менеджер магазина ответит в этом чате.",
            user.first_name
        ),
    )
    .await?;
    Ok(())
}

/// Runs an admin command. Any command abandons unfinished input first.
pub(super) async fn handle_admin_command(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    dialogue: &ShopDialogue,
    deps: &HandlerDeps,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let today = today();
    dialogue.exit().await?;

    match cmd {
        Command::Start => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                main_menu_view(&conn)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::Help => {
            let mut text = Command::descriptions().to_string();
            if let Some(username) = &deps.bot_username {
                text.push_str(&format!("\n\nКлиенты пишут боту @{}, их сообщения приходят сюда.", username));
            }
            bot.send_message(chat_id, text).await?;
        }
        Command::Promos => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                promo::list_view(&conn, 0, today)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::NewPromo => start_input(bot, chat_id, dialogue, State::PromoCode).await?,
        Command::Actions => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                actions::list_view(&conn, 0, today)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::NewAction => start_input(bot, chat_id, dialogue, State::ActionTitle).await?,
        Command::Products => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                products::list_view(&conn, 0)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::Clients => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                messaging::clients_view(&conn, 0)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::Send(args) => handle_send(bot, msg, &args, dialogue, deps).await?,
        Command::Broadcast(text) => {
            let text = text.trim();
            if text.is_empty() {
                start_input(bot, chat_id, dialogue, State::Broadcast).await?;
            } else {
                let view = {
                    let conn = get_connection(&deps.db_pool)?;
                    messaging::broadcast_confirm_view(&conn, text)?
                };
                dialogue
                    .update(State::BroadcastConfirm { text: text.to_string() })
                    .await?;
                send_view(bot, chat_id, view).await?;
            }
        }
        Command::Stats => {
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                stats::stats_view(&conn, StatsPeriod::Week, today)?
            };
            send_view(bot, chat_id, view).await?;
        }
        Command::Backup => handle_backup_command(bot, chat_id, sender_id(msg)).await?,
        Command::Cancel => {
            bot.send_message(chat_id, "🚫 Отменено").await?;
        }
    }
    Ok(())
}

/// `/send <id> <text>` delivers right away; `/send <id>` asks for the text
async fn handle_send(bot: &Bot, msg: &Message, args: &str, dialogue: &ShopDialogue, deps: &HandlerDeps) -> Result<()> {
    let Some((client_id, text)) = messaging::parse_send_args(args) else {
        bot.send_message(msg.chat.id, SEND_USAGE).await?;
        return Ok(());
    };

    if text.is_empty() {
        let view = {
            let conn = get_connection(&deps.db_pool)?;
            messaging::compose_view(&conn, client_id)?
        };
        dialogue.update(State::MessageClient { client_id }).await?;
        send_view(bot, msg.chat.id, view).await?;
        return Ok(());
    }

    messaging::send_to_client(bot, &deps.db_pool, msg.chat.id, sender_id(msg), client_id, &text).await
}

/// Commands a non-admin may use; everything else from them goes to the inbox
pub(super) fn allowed_for(user_id: i64, cmd: &Command) -> bool {
    is_admin(user_id) || *cmd == Command::Start
}
