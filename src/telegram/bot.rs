//! Bot initialization and the admin command set
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list registration for admin chats

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, BotCommandScope, Recipient};
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::notifications::admin_chats;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команды панели магазина:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start,
    #[command(description = "список команд")]
    Help,
    #[command(description = "промокоды")]
    Promos,
    #[command(description = "создать промокод")]
    NewPromo,
    #[command(description = "акции")]
    Actions,
    #[command(description = "создать акцию")]
    NewAction,
    #[command(description = "товары и их фото")]
    Products,
    #[command(description = "клиенты")]
    Clients,
    #[command(description = "написать клиенту: /send <id> <текст>")]
    Send(String),
    #[command(description = "рассылка всем клиентам")]
    Broadcast(String),
    #[command(description = "статистика продаж")]
    Stats,
    #[command(description = "создать бэкап БД")]
    Backup,
    #[command(description = "отменить текущий ввод")]
    Cancel,
}

/// Builds the bot from `BOT_TOKEN`, pointed at `BOT_API_URL` when a local Bot API server is used
///
/// Fails when the token is missing or the URL does not parse.
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

/// The command menu shown in admin chats
pub fn admin_command_list() -> Vec<BotCommand> {
    Command::bot_commands()
}

/// Registers the command menu.
///
/// Clients only see `/start`; the full list is scoped to each admin chat.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![BotCommand::new("start", "начать")]).await?;

    for chat_id in admin_chats() {
        let scoped = bot
            .set_my_commands(admin_command_list())
            .scope(BotCommandScope::Chat {
                chat_id: Recipient::Id(chat_id),
            })
            .await;
        if let Err(e) = scoped {
            log::warn!("Failed to set admin commands for {}: {}", chat_id, e);
        }
    }

    Ok(())
}
