//! Admin input validation
//!
//! Every step of the conversational wizards funnels the raw message text through
//! one of these parsers. They are pure, so the dialogue layer only has to decide
//! which parser to call and what state comes next.

use chrono::NaiveDate;
use lazy_regex::regex_is_match;
use thiserror::Error;

use crate::core::config::promo::{
    CODE_MAX_LEN, CODE_MIN_LEN, MAX_DISCOUNT_PERCENT, MIN_DISCOUNT_PERCENT,
};

/// Validation errors
///
/// The `Display` text is shown to the admin as-is, so it is written in the
/// bot's UI language.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("пустое значение")]
    Empty,

    #[error("длина должна быть от {min} до {max} символов")]
    Length { min: usize, max: usize },

    #[error("допустимы только латинские буквы, цифры, «_» и «-»")]
    Charset,

    #[error("нужно целое число")]
    NotANumber,

    #[error("значение должно быть от {min} до {max}")]
    OutOfRange { min: i64, max: i64 },

    #[error("неверная дата «{0}», используй ДД.ММ.ГГГГ")]
    Date(String),

    #[error("дата начала позже даты окончания")]
    StartAfterEnd,

    #[error("дата окончания уже прошла")]
    EndInPast,
}

/// Words meaning "skip / no value" in wizard steps
pub fn is_skip(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "-" | "нет" | "no" | "skip")
}

/// Parses and normalizes a promo code.
///
/// The code is trimmed and upper-cased; codes are matched case-insensitively
/// in the database as well.
///
/// # Examples
/// ```
/// use shopdesk::core::validation::parse_promo_code;
///
/// assert_eq!(parse_promo_code("  summer-24 ").unwrap(), "SUMMER-24");
/// assert!(parse_promo_code("скидка").is_err());
/// ```
pub fn parse_promo_code(text: &str) -> Result<String, ValidationError> {
    let code = text.trim().to_uppercase();
    if code.is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = code.chars().count();
    if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&len) {
        return Err(ValidationError::Length {
            min: CODE_MIN_LEN,
            max: CODE_MAX_LEN,
        });
    }
    if !regex_is_match!(r"^[A-Z0-9_-]+$", &code) {
        return Err(ValidationError::Charset);
    }
    Ok(code)
}

/// Parses a discount percentage, accepting an optional trailing `%`.
pub fn parse_percent(text: &str) -> Result<u8, ValidationError> {
    let raw = text.trim().trim_end_matches('%').trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: i64 = raw.parse().map_err(|_| ValidationError::NotANumber)?;
    let (min, max) = (i64::from(MIN_DISCOUNT_PERCENT), i64::from(MAX_DISCOUNT_PERCENT));
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange { min, max });
    }
    // range-checked above
    Ok(value as u8)
}

/// Parses the maximum number of promo code activations.
///
/// `0` or a skip word means unlimited (`None`).
pub fn parse_usage_limit(text: &str) -> Result<Option<u32>, ValidationError> {
    if is_skip(text) {
        return Ok(None);
    }
    let raw = text.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: i64 = raw.parse().map_err(|_| ValidationError::NotANumber)?;
    match value {
        0 => Ok(None),
        1..=1_000_000 => Ok(Some(value as u32)),
        _ => Err(ValidationError::OutOfRange { min: 0, max: 1_000_000 }),
    }
}

/// Parses a calendar date in `DD.MM.YYYY` or ISO `YYYY-MM-DD` form.
pub fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
    let raw = text.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| ValidationError::Date(raw.to_string()))
}

/// Like [`parse_date`], but a skip word yields `None`.
pub fn parse_optional_date(text: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if is_skip(text) {
        return Ok(None);
    }
    parse_date(text).map(Some)
}

/// Checks an inclusive date range for a new promo code or action.
///
/// Either bound may be open. A closed range must not be reversed and its end
/// must not already be in the past.
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::StartAfterEnd);
        }
    }
    if let Some(end) = end {
        if end < today {
            return Err(ValidationError::EndInPast);
        }
    }
    Ok(())
}

/// Checks an inclusive statistics range. Past ranges are fine here.
pub fn validate_report_range(from: NaiveDate, to: NaiveDate) -> Result<(), ValidationError> {
    if from > to {
        return Err(ValidationError::StartAfterEnd);
    }
    Ok(())
}

/// Trims free text and checks it is non-empty and at most `max` characters.
pub fn parse_title(text: &str, max: usize) -> Result<String, ValidationError> {
    let title = text.trim();
    if title.is_empty() {
        return Err(ValidationError::Empty);
    }
    if title.chars().count() > max {
        return Err(ValidationError::Length { min: 1, max });
    }
    Ok(title.to_string())
}

/// Free text where a skip word means "leave empty".
pub fn parse_optional_text(text: &str, max: usize) -> Result<String, ValidationError> {
    if is_skip(text) {
        return Ok(String::new());
    }
    parse_title(text, max)
}
