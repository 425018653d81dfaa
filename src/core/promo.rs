//! Promo code model and discount rules

use chrono::NaiveDate;
use std::fmt;

/// A promo code row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoCode {
    pub id: i64,
    /// Upper-cased code, unique case-insensitively
    pub code: String,
    pub discount_percent: u8,
    /// `None` means unlimited activations
    pub max_uses: Option<u32>,
    pub used_count: u32,
    /// First day the code can be used, inclusive
    pub valid_from: Option<NaiveDate>,
    /// Last day the code can be used, inclusive
    pub valid_until: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: String,
}

/// Why a promo code cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    Inactive,
    NotStarted,
    Expired,
    Exhausted,
    AlreadyUsed,
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PromoRejection::Inactive => "промокод отключён",
            PromoRejection::NotStarted => "промокод ещё не действует",
            PromoRejection::Expired => "срок действия промокода истёк",
            PromoRejection::Exhausted => "лимит активаций исчерпан",
            PromoRejection::AlreadyUsed => "клиент уже использовал этот промокод",
        };
        f.write_str(text)
    }
}

impl std::error::Error for PromoRejection {}

/// Display status of a promo code in admin lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoStatus {
    Active,
    Disabled,
    Scheduled,
    Expired,
    Exhausted,
}

impl PromoStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            PromoStatus::Active => "🟢",
            PromoStatus::Disabled => "⚪️",
            PromoStatus::Scheduled => "🕓",
            PromoStatus::Expired => "⌛️",
            PromoStatus::Exhausted => "🔴",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PromoStatus::Active => "активен",
            PromoStatus::Disabled => "выключен",
            PromoStatus::Scheduled => "запланирован",
            PromoStatus::Expired => "истёк",
            PromoStatus::Exhausted => "исчерпан",
        }
    }
}

impl PromoCode {
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }

    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_uses.map(|max| max.saturating_sub(self.used_count))
    }

    /// Status shown in the admin list on `today`
    pub fn status(&self, today: NaiveDate) -> PromoStatus {
        if !self.is_active {
            PromoStatus::Disabled
        } else if self.valid_until.is_some_and(|until| today > until) {
            PromoStatus::Expired
        } else if self.is_exhausted() {
            PromoStatus::Exhausted
        } else if self.valid_from.is_some_and(|from| today < from) {
            PromoStatus::Scheduled
        } else {
            PromoStatus::Active
        }
    }
}

/// Checks whether `promo` can be applied on `today` by a client who has
/// already used it `client_uses` times.
///
/// The checks run in a fixed order (inactive, not started, expired,
/// exhausted, already used) so the admin sees the most fundamental reason.
/// Returns the discount percentage on success.
pub fn check_promo(promo: &PromoCode, today: NaiveDate, client_uses: u32) -> Result<u8, PromoRejection> {
    if !promo.is_active {
        return Err(PromoRejection::Inactive);
    }
    if promo.valid_from.is_some_and(|from| today < from) {
        return Err(PromoRejection::NotStarted);
    }
    if promo.valid_until.is_some_and(|until| today > until) {
        return Err(PromoRejection::Expired);
    }
    if promo.is_exhausted() {
        return Err(PromoRejection::Exhausted);
    }
    if client_uses > 0 {
        return Err(PromoRejection::AlreadyUsed);
    }
    Ok(promo.discount_percent)
}

/// Applies a percentage discount to `amount` kopecks.
///
/// The discount is rounded down to whole kopecks, so the shop never gives away
/// more than the advertised percentage. Returns `(discount, total)`.
pub fn apply_discount(amount: i64, percent: u8) -> (i64, i64) {
    if amount <= 0 {
        return (0, amount.max(0));
    }
    let percent = i64::from(percent.min(100));
    let discount = amount * percent / 100;
    (discount, amount - discount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn promo() -> PromoCode {
        PromoCode {
            id: 1,
            code: "SPRING".to_string(),
            discount_percent: 10,
            max_uses: Some(3),
            used_count: 0,
            valid_from: Some(date(2025, 3, 1)),
            valid_until: Some(date(2025, 5, 31)),
            is_active: true,
            created_at: "2025-02-20 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_valid_promo_gives_discount() {
        assert_eq!(check_promo(&promo(), date(2025, 4, 1), 0), Ok(10));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(check_promo(&promo(), date(2025, 3, 1), 0).is_ok());
        assert!(check_promo(&promo(), date(2025, 5, 31), 0).is_ok());
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            check_promo(&promo(), date(2025, 2, 28), 0),
            Err(PromoRejection::NotStarted)
        );
        assert_eq!(check_promo(&promo(), date(2025, 6, 1), 0), Err(PromoRejection::Expired));

        let exhausted = PromoCode {
            used_count: 3,
            ..promo()
        };
        assert_eq!(
            check_promo(&exhausted, date(2025, 4, 1), 0),
            Err(PromoRejection::Exhausted)
        );

        assert_eq!(
            check_promo(&promo(), date(2025, 4, 1), 1),
            Err(PromoRejection::AlreadyUsed)
        );
    }

    #[test]
    fn test_inactive_reported_first() {
        let disabled = PromoCode {
            is_active: false,
            used_count: 3,
            ..promo()
        };
        assert_eq!(
            check_promo(&disabled, date(2030, 1, 1), 5),
            Err(PromoRejection::Inactive)
        );
    }

    #[test]
    fn test_unlimited_open_ended() {
        let open = PromoCode {
            max_uses: None,
            used_count: 10_000,
            valid_from: None,
            valid_until: None,
            ..promo()
        };
        assert_eq!(check_promo(&open, date(1999, 1, 1), 0), Ok(10));
        assert_eq!(open.remaining_uses(), None);
    }

    #[test]
    fn test_status() {
        assert_eq!(promo().status(date(2025, 4, 1)), PromoStatus::Active);
        assert_eq!(promo().status(date(2025, 2, 1)), PromoStatus::Scheduled);
        assert_eq!(promo().status(date(2025, 6, 1)), PromoStatus::Expired);
        let off = PromoCode {
            is_active: false,
            ..promo()
        };
        assert_eq!(off.status(date(2025, 4, 1)), PromoStatus::Disabled);
        let used = PromoCode {
            used_count: 5,
            ..promo()
        };
        assert_eq!(used.status(date(2025, 4, 1)), PromoStatus::Exhausted);
        assert_eq!(used.remaining_uses(), Some(0));
    }

    #[test]
    fn test_apply_discount_rounds_down() {
        assert_eq!(apply_discount(10_000, 15), (1_500, 8_500));
        assert_eq!(apply_discount(999, 10), (99, 900));
        assert_eq!(apply_discount(1, 50), (0, 1));
        assert_eq!(apply_discount(0, 50), (0, 0));
        assert_eq!(apply_discount(500, 100), (500, 0));
    }
}
