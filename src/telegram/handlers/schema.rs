//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{dialogue, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{allowed_for, handle_admin_command, handle_client_start};
use super::input::handle_admin_input;
use super::types::{is_admin_message, is_client_chat, sender_id, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::callbacks::route_callback;
use crate::telegram::dialogue::{DialogueStorage, ShopDialogue, State};
use crate::telegram::messaging::handle_client_message;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree is used in production and in integration tests.
/// `InMemStorage<State>` must be present in the dispatcher dependencies.
///
/// # Arguments
/// * `deps` - Handler dependencies (database pool, bot username)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_input = deps.clone();
    let deps_inbox = deps.clone();
    let deps_callback = deps;

    dialogue::enter::<Update, DialogueStorage, State, _>()
        // Commands first: /cancel must work from any dialogue state
        .branch(command_handler(deps_commands))
        .branch(admin_input_handler(deps_input))
        .branch(admin_idle_handler())
        .branch(client_inbox_handler(deps_inbox))
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands. Clients only reach /start here.
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(
        dptree::entry()
            .filter_command::<Command>()
            .filter(|msg: Message, cmd: Command| allowed_for(sender_id(&msg), &cmd))
            .endpoint(move |bot: Bot, msg: Message, cmd: Command, dialogue: ShopDialogue| {
                let deps = deps.clone();
                async move {
                    log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                    let result = if is_admin_message(&msg) {
                        handle_admin_command(&bot, &msg, cmd, &dialogue, &deps).await
                    } else {
                        handle_client_start(&bot, &msg, &deps).await
                    };
                    if let Err(e) = result {
                        log::error!("❌ Command failed in chat {}: {}", msg.chat.id, e);
                        let _ = bot.send_message(msg.chat.id, format!("❌ Ошибка: {}", e)).await;
                    }
                    Ok(())
                }
            }),
    )
}

/// Handler for admin answers while a dialogue is waiting for input
fn admin_input_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_admin_message(&msg))
        .filter(|state: State| !state.is_idle())
        .endpoint(move |bot: Bot, msg: Message, dialogue: ShopDialogue, state: State| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_admin_input(&bot, &msg, &dialogue, state, &deps).await {
                    log::error!("❌ Dialogue input failed in chat {}: {}", msg.chat.id, e);
                    let _ = bot.send_message(msg.chat.id, format!("❌ Ошибка: {}", e)).await;
                }
                Ok(())
            }
        })
}

/// Admin wrote something with no dialogue in progress
fn admin_idle_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_admin_message(&msg))
        .endpoint(|bot: Bot, msg: Message| async move {
            bot.send_message(msg.chat.id, "Открой меню командой /start или посмотри /help")
                .await?;
            Ok(())
        })
}

/// Handler for messages from clients: everything lands in the admins' inbox
fn client_inbox_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| is_client_chat(&msg))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_client_message(&bot, &msg, &deps.db_pool).await {
                    log::error!("❌ Failed to process client message in chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery, dialogue: ShopDialogue| {
        let deps = deps.clone();
        async move {
            let query_id = q.id.clone();
            if let Err(e) = route_callback(bot.clone(), q, dialogue, deps.db_pool.clone()).await {
                log::error!("❌ Callback failed: {}", e);
                let _ = bot.answer_callback_query(query_id).text("❌ Ошибка, попробуй ещё раз").await;
            }
            Ok(())
        }
    })
}
