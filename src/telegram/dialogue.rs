//! Conversation state of an admin chat
//!
//! Multi-step input is a finite-state machine stored per chat in teloxide's
//! `InMemStorage`. Wizard steps are advanced by pure functions so the whole
//! flow can be tested without a bot.

use chrono::NaiveDate;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::core::config::promo::{DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};
use crate::core::validation::{
    parse_date, parse_optional_date, parse_optional_text, parse_percent, parse_promo_code, parse_title,
    parse_usage_limit, validate_date_range, validate_report_range, ValidationError,
};
use crate::storage::actions::NewAction;
use crate::storage::promo::NewPromo;

pub type ShopDialogue = Dialogue<State, InMemStorage<State>>;
pub type DialogueStorage = InMemStorage<State>;

/// Promo code collected so far by the wizard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromoDraft {
    pub code: String,
    pub discount_percent: u8,
    pub max_uses: Option<u32>,
    pub valid_from: Option<NaiveDate>,
}

/// Action collected so far by the wizard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionDraft {
    pub title: String,
    pub description: String,
    pub discount_percent: u8,
    pub starts_on: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,

    PromoCode,
    PromoDiscount { draft: PromoDraft },
    PromoLimit { draft: PromoDraft },
    PromoValidFrom { draft: PromoDraft },
    PromoValidUntil { draft: PromoDraft },
    /// Everything answered but the code already exists; only the code is asked again
    PromoCodeTaken { promo: NewPromo },

    ActionTitle,
    ActionDescription { draft: ActionDraft },
    ActionDiscount { draft: ActionDraft },
    ActionStart { draft: ActionDraft },
    ActionEnd { draft: ActionDraft },
    /// Action saved, waiting for an optional banner photo
    ActionImage { action_id: i64 },
    ActionImageReplace { action_id: i64 },

    ProductImage { product_id: i64 },

    MessageClient { client_id: i64 },
    Broadcast,
    BroadcastConfirm { text: String },

    StatsFrom,
    StatsTo { from: NaiveDate },
}

/// Outcome of feeding one answer to a wizard
#[derive(Debug, PartialEq, Eq)]
pub enum Step<T> {
    /// Ask the next question
    Next(State),
    /// All answers collected
    Done(T),
    /// Invalid answer; the state stays and the question is repeated
    Retry(ValidationError),
}

impl State {
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    pub fn is_promo_wizard(&self) -> bool {
        matches!(
            self,
            State::PromoCode
                | State::PromoDiscount { .. }
                | State::PromoLimit { .. }
                | State::PromoValidFrom { .. }
                | State::PromoValidUntil { .. }
                | State::PromoCodeTaken { .. }
        )
    }

    pub fn is_action_wizard(&self) -> bool {
        matches!(
            self,
            State::ActionTitle
                | State::ActionDescription { .. }
                | State::ActionDiscount { .. }
                | State::ActionStart { .. }
                | State::ActionEnd { .. }
        )
    }

    /// States that wait for a photo rather than text
    pub fn awaits_photo(&self) -> bool {
        matches!(
            self,
            State::ActionImage { .. } | State::ActionImageReplace { .. } | State::ProductImage { .. }
        )
    }

    /// The question asked in this state
    pub fn prompt(&self) -> &'static str {
        match self {
            State::Idle => "Выбери действие в меню.",
            State::PromoCode => "🎟 Введи промокод (латиница, цифры, «_» и «-», 3-32 символа):",
            State::PromoDiscount { .. } => "Размер скидки в процентах (1-95):",
            State::PromoLimit { .. } => "Сколько раз можно активировать? Число, или «-» без ограничений:",
            State::PromoValidFrom { .. } => "Дата начала действия (ДД.ММ.ГГГГ) или «-», чтобы начать сразу:",
            State::PromoValidUntil { .. } => "Дата окончания (ДД.ММ.ГГГГ) или «-» без срока:",
            State::PromoCodeTaken { .. } => "🎟 Введи другой промокод, остальные условия сохранены:",
            State::ActionTitle => "📣 Название акции:",
            State::ActionDescription { .. } => "Описание акции (или «-» без описания):",
            State::ActionDiscount { .. } => "Скидка по акции в процентах (1-95):",
            State::ActionStart { .. } => "Дата начала акции (ДД.ММ.ГГГГ):",
            State::ActionEnd { .. } => "Дата окончания акции (ДД.ММ.ГГГГ):",
            State::ActionImage { .. } => "🖼 Пришли баннер акции фотографией или «-», чтобы пропустить:",
            State::ActionImageReplace { .. } => "🖼 Пришли новый баннер акции фотографией:",
            State::ProductImage { .. } => "📷 Пришли фотографию товара:",
            State::MessageClient { .. } => "✉️ Напиши сообщение клиенту:",
            State::Broadcast => "📢 Напиши текст рассылки:",
            State::BroadcastConfirm { .. } => "Отправить рассылку? Нажми кнопку ниже.",
            State::StatsFrom => "📊 Начало периода (ДД.ММ.ГГГГ):",
            State::StatsTo { .. } => "Конец периода (ДД.ММ.ГГГГ):",
        }
    }
}

impl PromoDraft {
    /// Feeds the admin's answer to the promo wizard question of `state`.
    ///
    /// States outside the promo wizard are returned unchanged.
    pub fn apply(state: State, text: &str, today: NaiveDate) -> Step<NewPromo> {
        let result = match state {
            State::PromoCode => parse_promo_code(text).map(|code| {
                Step::Next(State::PromoDiscount {
                    draft: PromoDraft {
                        code,
                        ..PromoDraft::default()
                    },
                })
            }),
            State::PromoDiscount { draft } => parse_percent(text).map(|discount_percent| {
                Step::Next(State::PromoLimit {
                    draft: PromoDraft {
                        discount_percent,
                        ..draft
                    },
                })
            }),
            State::PromoLimit { draft } => parse_usage_limit(text)
                .map(|max_uses| Step::Next(State::PromoValidFrom { draft: PromoDraft { max_uses, ..draft } })),
            State::PromoValidFrom { draft } => parse_optional_date(text).map(|valid_from| {
                Step::Next(State::PromoValidUntil {
                    draft: PromoDraft { valid_from, ..draft },
                })
            }),
            State::PromoValidUntil { draft } => parse_optional_date(text).and_then(|valid_until| {
                validate_date_range(draft.valid_from, valid_until, today)?;
                Ok(Step::Done(NewPromo {
                    code: draft.code,
                    discount_percent: draft.discount_percent,
                    max_uses: draft.max_uses,
                    valid_from: draft.valid_from,
                    valid_until,
                }))
            }),
            State::PromoCodeTaken { promo } => {
                parse_promo_code(text).map(|code| Step::Done(NewPromo { code, ..promo }))
            }
            other => Ok(Step::Next(other)),
        };
        result.unwrap_or_else(Step::Retry)
    }
}

impl ActionDraft {
    /// Feeds the admin's answer to the action wizard question of `state`.
    ///
    /// States outside the action wizard are returned unchanged.
    pub fn apply(state: State, text: &str, today: NaiveDate) -> Step<NewAction> {
        let result = match state {
            State::ActionTitle => parse_title(text, TITLE_MAX_LEN).map(|title| {
                Step::Next(State::ActionDescription {
                    draft: ActionDraft {
                        title,
                        ..ActionDraft::default()
                    },
                })
            }),
            State::ActionDescription { draft } => parse_optional_text(text, DESCRIPTION_MAX_LEN)
                .map(|description| Step::Next(State::ActionDiscount { draft: ActionDraft { description, ..draft } })),
            State::ActionDiscount { draft } => parse_percent(text).map(|discount_percent| {
                Step::Next(State::ActionStart {
                    draft: ActionDraft {
                        discount_percent,
                        ..draft
                    },
                })
            }),
            State::ActionStart { draft } => parse_date(text).map(|starts_on| {
                Step::Next(State::ActionEnd {
                    draft: ActionDraft {
                        starts_on: Some(starts_on),
                        ..draft
                    },
                })
            }),
            State::ActionEnd { draft } => parse_date(text).and_then(|ends_on| {
                let starts_on = draft.starts_on.unwrap_or(today);
                validate_date_range(Some(starts_on), Some(ends_on), today)?;
                Ok(Step::Done(NewAction {
                    title: draft.title,
                    description: draft.description,
                    discount_percent: draft.discount_percent,
                    starts_on,
                    ends_on,
                }))
            }),
            other => Ok(Step::Next(other)),
        };
        result.unwrap_or_else(Step::Retry)
    }
}

/// Advances the custom statistics range: `StatsFrom` then `StatsTo`.
pub fn apply_stats_range(state: State, text: &str) -> Step<(NaiveDate, NaiveDate)> {
    let result = match state {
        State::StatsFrom => parse_date(text).map(|from| Step::Next(State::StatsTo { from })),
        State::StatsTo { from } => parse_date(text).and_then(|to| {
            validate_report_range(from, to)?;
            Ok(Step::Done((from, to)))
        }),
        other => Ok(Step::Next(other)),
    };
    result.unwrap_or_else(Step::Retry)
}
