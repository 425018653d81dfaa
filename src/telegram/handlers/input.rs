//! Admin input while a dialogue is in progress (wizard answers, photos, message text)

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message};

use super::types::{sender_id, HandlerDeps};
use crate::core::config::messaging::MAX_MESSAGE_LEN;
use crate::core::types::{today, StatsPeriod};
use crate::core::validation::is_skip;
use crate::storage::{actions as action_store, get_connection};
use crate::telegram::dialogue::{apply_stats_range, ActionDraft, PromoDraft, ShopDialogue, State, Step};
use crate::telegram::keyboards::send_view;
use crate::telegram::{actions, messaging, products, promo, stats, Bot};

/// Moves the dialogue along a wizard step.
///
/// Returns the finished value on `Step::Done`; otherwise the next question (or
/// the validation error followed by the same question) has already been sent.
async fn advance<T>(bot: &Bot, chat_id: ChatId, dialogue: &ShopDialogue, current: &State, step: Step<T>) -> Result<Option<T>> {
    match step {
        Step::Next(next) => {
            let prompt = next.prompt();
            dialogue.update(next).await?;
            bot.send_message(chat_id, prompt).await?;
            Ok(None)
        }
        Step::Retry(err) => {
            bot.send_message(chat_id, format!("❌ {}\n\n{}", err, current.prompt()))
                .await?;
            Ok(None)
        }
        Step::Done(value) => Ok(Some(value)),
    }
}

pub(super) async fn handle_admin_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    state: State,
    deps: &HandlerDeps,
) -> Result<()> {
    if state.awaits_photo() {
        return handle_photo_input(bot, msg, dialogue, state, deps).await;
    }

    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, format!("Нужен текст.\n\n{}", state.prompt()))
            .await?;
        return Ok(());
    };
    let today = today();

    if state.is_promo_wizard() {
        let step = PromoDraft::apply(state.clone(), text, today);
        if let Some(new_promo) = advance(bot, chat_id, dialogue, &state, step).await? {
            let (saved, view) = {
                let conn = get_connection(&deps.db_pool)?;
                (promo::save(&conn, &new_promo)?, promo::list_view(&conn, 0, today)?)
            };
            match saved {
                Ok(confirmation) => {
                    log::info!("🎟 Promo {} created by admin {}", new_promo.code, sender_id(msg));
                    dialogue.exit().await?;
                    bot.send_message(chat_id, confirmation).await?;
                    send_view(bot, chat_id, view).await?;
                }
                Err(reason) => {
                    let retake = State::PromoCodeTaken { promo: new_promo };
                    let prompt = retake.prompt();
                    dialogue.update(retake).await?;
                    bot.send_message(chat_id, format!("{}\n\n{}", reason, prompt)).await?;
                }
            }
        }
        return Ok(());
    }

    if state.is_action_wizard() {
        let step = ActionDraft::apply(state.clone(), text, today);
        if let Some(new_action) = advance(bot, chat_id, dialogue, &state, step).await? {
            let (action_id, confirmation) = {
                let conn = get_connection(&deps.db_pool)?;
                actions::save(&conn, &new_action)?
            };
            log::info!("📣 Action {} «{}» created", action_id, new_action.title);
            let next = State::ActionImage { action_id };
            let prompt = next.prompt();
            dialogue.update(next).await?;
            bot.send_message(chat_id, format!("{}\n\n{}", confirmation, prompt))
                .await?;
        }
        return Ok(());
    }

    match state {
        State::StatsFrom | State::StatsTo { .. } => {
            let step = apply_stats_range(state.clone(), text);
            if let Some((from, to)) = advance(bot, chat_id, dialogue, &state, step).await? {
                dialogue.exit().await?;
                let view = {
                    let conn = get_connection(&deps.db_pool)?;
                    stats::stats_view(&conn, StatsPeriod::Custom(from, to), today)?
                };
                send_view(bot, chat_id, view).await?;
            }
        }
        State::MessageClient { client_id } => {
            dialogue.exit().await?;
            messaging::send_to_client(bot, &deps.db_pool, chat_id, sender_id(msg), client_id, text).await?;
        }
        State::Broadcast => {
            if text.chars().count() > MAX_MESSAGE_LEN {
                bot.send_message(chat_id, format!("❌ Текст длиннее {} символов", MAX_MESSAGE_LEN))
                    .await?;
                return Ok(());
            }
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                messaging::broadcast_confirm_view(&conn, text)?
            };
            dialogue
                .update(State::BroadcastConfirm { text: text.to_string() })
                .await?;
            send_view(bot, chat_id, view).await?;
        }
        other => {
            bot.send_message(chat_id, other.prompt()).await?;
        }
    }
    Ok(())
}

async fn handle_photo_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    state: State,
    deps: &HandlerDeps,
) -> Result<()> {
    let chat_id = msg.chat.id;

    if let State::ActionImage { .. } = state {
        if msg.text().is_some_and(is_skip) {
            dialogue.exit().await?;
            bot.send_message(chat_id, "✅ Акция сохранена без баннера").await?;
            let view = {
                let conn = get_connection(&deps.db_pool)?;
                actions::list_view(&conn, 0, today())?
            };
            send_view(bot, chat_id, view).await?;
            return Ok(());
        }
    }

    let Some(file_id) = products::image_file_id(msg) else {
        bot.send_message(chat_id, format!("Это не изображение.\n\n{}", state.prompt()))
            .await?;
        return Ok(());
    };

    match state {
        State::ProductImage { product_id } => {
            let (confirmation, view) = {
                let conn = get_connection(&deps.db_pool)?;
                let confirmation = products::save_image(&conn, product_id, &file_id)?;
                (confirmation, products::list_view(&conn, 0)?)
            };
            dialogue.exit().await?;
            bot.send_message(chat_id, confirmation).await?;
            send_view(bot, chat_id, view).await?;
        }
        State::ActionImage { action_id } | State::ActionImageReplace { action_id } => {
            let (stored, view) = {
                let conn = get_connection(&deps.db_pool)?;
                let stored = action_store::set_action_image(&conn, action_id, Some(&file_id))?;
                (stored, actions::list_view(&conn, 0, today())?)
            };
            dialogue.exit().await?;
            let reply = if stored {
                log::info!("🖼 Banner set for action {}", action_id);
                "✅ Баннер акции сохранён"
            } else {
                "❌ Акция не найдена"
            };
            bot.send_message(chat_id, reply).await?;
            send_view(bot, chat_id, view).await?;
        }
        other => {
            bot.send_message(chat_id, other.prompt()).await?;
        }
    }
    Ok(())
}
