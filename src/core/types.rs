use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Lifecycle of a storefront order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Paid, shipped and completed orders count as sales in statistics
    pub fn counts_as_sale(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed)
    }

    /// SQL list literal of sale statuses, for `status IN (...)` clauses
    pub fn sale_statuses_sql() -> &'static str {
        "('paid', 'shipped', 'completed')"
    }
}

// rusqlite FromSql: read status from DB text column
impl rusqlite::types::FromSql for OrderStatus {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        OrderStatus::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

// rusqlite ToSql: write status as text to DB
impl rusqlite::types::ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_ref().as_bytes(),
        )))
    }
}

/// Direction of a logged client message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum MessageDirection {
    /// Written by the client to the shop
    #[strum(serialize = "in")]
    Incoming,
    /// Written by an admin to the client
    #[strum(serialize = "out")]
    Outgoing,
}

impl rusqlite::types::FromSql for MessageDirection {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        MessageDirection::from_str(s).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

impl rusqlite::types::ToSql for MessageDirection {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::Borrowed(rusqlite::types::ValueRef::Text(
            self.as_ref().as_bytes(),
        )))
    }
}

/// Current date in UTC.
///
/// SQLite's `CURRENT_TIMESTAMP` defaults are UTC, so every "today" compared
/// against stored timestamps must come from here, not from the local clock.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Reporting period for sales statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Today,
    /// Last 7 days including today
    Week,
    /// Calendar month to date
    Month,
    /// Calendar year to date
    Year,
    AllTime,
    Custom(NaiveDate, NaiveDate),
}

impl StatsPeriod {
    /// Inclusive date bounds of the period relative to `today`
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            StatsPeriod::Today => (today, today),
            StatsPeriod::Week => (today - Duration::days(6), today),
            StatsPeriod::Month => (today.with_day(1).unwrap_or(today), today),
            StatsPeriod::Year => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            ),
            StatsPeriod::AllTime => (NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN), today),
            StatsPeriod::Custom(from, to) => (from, to),
        }
    }

    pub fn label(&self) -> String {
        match self {
            StatsPeriod::Today => "сегодня".to_string(),
            StatsPeriod::Week => "7 дней".to_string(),
            StatsPeriod::Month => "текущий месяц".to_string(),
            StatsPeriod::Year => "текущий год".to_string(),
            StatsPeriod::AllTime => "всё время".to_string(),
            StatsPeriod::Custom(from, to) => {
                format!("{} … {}", from.format("%d.%m.%Y"), to.format("%d.%m.%Y"))
            }
        }
    }

    /// Short key used in callback data for the preset periods
    pub fn key(&self) -> Option<&'static str> {
        match self {
            StatsPeriod::Today => Some("today"),
            StatsPeriod::Week => Some("week"),
            StatsPeriod::Month => Some("month"),
            StatsPeriod::Year => Some("year"),
            StatsPeriod::AllTime => Some("all"),
            StatsPeriod::Custom(..) => None,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "today" => Some(StatsPeriod::Today),
            "week" => Some(StatsPeriod::Week),
            "month" => Some(StatsPeriod::Month),
            "year" => Some(StatsPeriod::Year),
            "all" => Some(StatsPeriod::AllTime),
            _ => None,
        }
    }

    pub fn presets() -> [StatsPeriod; 5] {
        [
            StatsPeriod::Today,
            StatsPeriod::Week,
            StatsPeriod::Month,
            StatsPeriod::Year,
            StatsPeriod::AllTime,
        ]
    }
}

/// Formats kopecks as rubles with space-grouped thousands: `1 234.50 ₽`
pub fn format_money(kopecks: i64) -> String {
    let sign = if kopecks < 0 { "-" } else { "" };
    let abs = kopecks.unsigned_abs();
    let rubles = abs / 100;
    let cents = abs % 100;

    let digits = rubles.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02} ₽", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_order_status_from_str() {
        assert_eq!(OrderStatus::from_str("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(OrderStatus::from_str("cancelled").unwrap(), OrderStatus::Cancelled);
        assert!(OrderStatus::from_str("lost").is_err());
    }

    #[test]
    fn test_order_status_display() {
        assert_eq!(OrderStatus::Shipped.to_string(), "shipped");
        assert_eq!(OrderStatus::New.as_ref(), "new");
    }

    #[test]
    fn test_counts_as_sale() {
        assert!(!OrderStatus::New.counts_as_sale());
        assert!(OrderStatus::Paid.counts_as_sale());
        assert!(OrderStatus::Completed.counts_as_sale());
        assert!(!OrderStatus::Cancelled.counts_as_sale());
    }

    #[test]
    fn test_message_direction_roundtrip() {
        assert_eq!(MessageDirection::Incoming.as_ref(), "in");
        assert_eq!(MessageDirection::from_str("out").unwrap(), MessageDirection::Outgoing);
    }

    #[test]
    fn test_period_bounds() {
        let today = date(2025, 3, 15);
        assert_eq!(StatsPeriod::Today.bounds(today), (today, today));
        assert_eq!(StatsPeriod::Week.bounds(today), (date(2025, 3, 9), today));
        assert_eq!(StatsPeriod::Month.bounds(today), (date(2025, 3, 1), today));
        assert_eq!(StatsPeriod::Year.bounds(today), (date(2025, 1, 1), today));
        let custom = StatsPeriod::Custom(date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(custom.bounds(today), (date(2024, 1, 1), date(2024, 1, 31)));
    }

    #[test]
    fn test_period_keys() {
        for period in StatsPeriod::presets() {
            let key = period.key().unwrap();
            assert_eq!(StatsPeriod::from_key(key), Some(period));
        }
        assert_eq!(StatsPeriod::from_key("decade"), None);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "0.00 ₽");
        assert_eq!(format_money(5), "0.05 ₽");
        assert_eq!(format_money(19_990), "199.90 ₽");
        assert_eq!(format_money(123_456_700), "1 234 567.00 ₽");
        assert_eq!(format_money(-150), "-1.50 ₽");
    }
}
