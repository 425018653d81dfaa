//! Promo code storage
//!
//! CRUD for `promo_codes` plus redemption bookkeeping in `promo_usages`.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::pagination::Page;
use crate::core::promo::{check_promo, PromoCode, PromoRejection};

/// Errors of promo code operations that the admin should see as such
#[derive(Debug, Error)]
pub enum PromoStoreError {
    #[error("промокод {0} уже существует")]
    DuplicateCode(String),

    #[error("промокод не найден")]
    NotFound,

    #[error("промокод уже применён в заказах, его можно только выключить")]
    InUse,

    #[error("{0}")]
    Rejected(#[from] PromoRejection),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Parameters for a new promo code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromo {
    pub code: String,
    pub discount_percent: u8,
    pub max_uses: Option<u32>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

const PROMO_COLUMNS: &str =
    "id, code, discount_percent, max_uses, used_count, valid_from, valid_until, is_active, created_at";

fn promo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PromoCode> {
    Ok(PromoCode {
        id: row.get(0)?,
        code: row.get(1)?,
        discount_percent: row.get(2)?,
        max_uses: row.get(3)?,
        used_count: row.get(4)?,
        valid_from: row.get(5)?,
        valid_until: row.get(6)?,
        is_active: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Inserts a promo code and returns its ID.
///
/// Codes are unique case-insensitively (`COLLATE NOCASE`).
pub fn create_promo(conn: &Connection, promo: &NewPromo) -> Result<i64, PromoStoreError> {
    let result = conn.execute(
        "INSERT INTO promo_codes (code, discount_percent, max_uses, valid_from, valid_until)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            promo.code,
            promo.discount_percent,
            promo.max_uses,
            promo.valid_from,
            promo.valid_until,
        ],
    );

    match result {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            log::info!("Created promo code {} (id={}, -{}%)", promo.code, id, promo.discount_percent);
            Ok(id)
        }
        Err(e) if is_unique_violation(&e) => Err(PromoStoreError::DuplicateCode(promo.code.clone())),
        Err(e) => Err(e.into()),
    }
}

pub fn get_promo(conn: &Connection, id: i64) -> rusqlite::Result<Option<PromoCode>> {
    conn.query_row(
        &format!("SELECT {} FROM promo_codes WHERE id = ?1", PROMO_COLUMNS),
        params![id],
        promo_from_row,
    )
    .optional()
}

/// Looks a code up case-insensitively
pub fn find_promo_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<PromoCode>> {
    conn.query_row(
        &format!("SELECT {} FROM promo_codes WHERE code = ?1", PROMO_COLUMNS),
        params![code.trim()],
        promo_from_row,
    )
    .optional()
}

pub fn count_promos(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COUNT(*) FROM promo_codes", [], |row| row.get(0))
}

/// Lists promo codes newest first
pub fn list_promos(conn: &Connection, page: &Page) -> rusqlite::Result<Vec<PromoCode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM promo_codes ORDER BY id DESC LIMIT ?1 OFFSET ?2",
        PROMO_COLUMNS
    ))?;
    let promos = stmt
        .query_map(params![page.limit(), page.offset()], promo_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(promos)
}

/// Enables or disables a code. Returns `false` if it does not exist.
pub fn set_promo_active(conn: &Connection, id: i64, active: bool) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE promo_codes SET is_active = ?1 WHERE id = ?2",
        params![active as i32, id],
    )?;
    Ok(changed > 0)
}

/// Deletes a code that no order refers to.
///
/// Codes that were applied to orders stay for statistics; the caller should
/// offer to disable them instead.
pub fn delete_promo(conn: &Connection, id: i64) -> Result<(), PromoStoreError> {
    let referenced: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE promo_code_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if referenced > 0 {
        return Err(PromoStoreError::InUse);
    }

    let deleted = conn.execute("DELETE FROM promo_codes WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(PromoStoreError::NotFound);
    }
    log::info!("Deleted promo code id={}", id);
    Ok(())
}

/// How many times `client_id` has redeemed the code
pub fn client_usage_count(conn: &Connection, promo_id: i64, client_id: i64) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM promo_usages WHERE promo_code_id = ?1 AND client_id = ?2",
        params![promo_id, client_id],
        |row| row.get(0),
    )
}

/// Validates and redeems a code for a client.
///
/// Runs inside the caller's transaction (pass `&tx`): looks the code up,
/// applies [`check_promo`], records the usage and bumps `used_count`. The
/// `used_count` update is guarded so concurrent redemptions cannot push it
/// past `max_uses`.
///
/// Returns the redeemed promo with its discount percentage.
pub fn redeem_promo(
    conn: &Connection,
    code: &str,
    client_id: i64,
    order_id: Option<i64>,
    today: NaiveDate,
) -> Result<PromoCode, PromoStoreError> {
    let promo = find_promo_by_code(conn, code)?.ok_or(PromoStoreError::NotFound)?;
    let uses = client_usage_count(conn, promo.id, client_id)?;
    check_promo(&promo, today, uses)?;

    let bumped = conn.execute(
        "UPDATE promo_codes SET used_count = used_count + 1
         WHERE id = ?1 AND (max_uses IS NULL OR used_count < max_uses)",
        params![promo.id],
    )?;
    if bumped == 0 {
        return Err(PromoRejection::Exhausted.into());
    }

    conn.execute(
        "INSERT INTO promo_usages (promo_code_id, client_id, order_id) VALUES (?1, ?2, ?3)",
        params![promo.id, client_id, order_id],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            PromoStoreError::Rejected(PromoRejection::AlreadyUsed)
        } else {
            e.into()
        }
    })?;

    log::info!("Client {} redeemed promo {}", client_id, promo.code);
    Ok(PromoCode {
        used_count: promo.used_count + 1,
        ..promo
    })
}

/// Links an existing usage row to the order it was applied to
pub fn attach_usage_to_order(
    conn: &Connection,
    promo_id: i64,
    client_id: i64,
    order_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE promo_usages SET order_id = ?1 WHERE promo_code_id = ?2 AND client_id = ?3",
        params![order_id, promo_id, client_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{add_client, test_conn};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_promo(code: &str) -> NewPromo {
        NewPromo {
            code: code.to_string(),
            discount_percent: 10,
            max_uses: None,
            valid_from: None,
            valid_until: None,
        }
    }

    #[test]
    fn create_and_read_back() {
        let conn = test_conn();
        let promo = NewPromo {
            max_uses: Some(50),
            valid_from: Some(date(2025, 1, 1)),
            valid_until: Some(date(2025, 12, 31)),
            ..new_promo("NEWYEAR")
        };
        let id = create_promo(&conn, &promo).unwrap();

        let stored = get_promo(&conn, id).unwrap().expect("must exist");
        assert_eq!(stored.code, "NEWYEAR");
        assert_eq!(stored.discount_percent, 10);
        assert_eq!(stored.max_uses, Some(50));
        assert_eq!(stored.used_count, 0);
        assert_eq!(stored.valid_from, Some(date(2025, 1, 1)));
        assert_eq!(stored.valid_until, Some(date(2025, 12, 31)));
        assert!(stored.is_active);
    }

    #[test]
    fn duplicate_code_rejected_case_insensitively() {
        let conn = test_conn();
        create_promo(&conn, &new_promo("SALE")).unwrap();
        let err = create_promo(&conn, &new_promo("sale")).unwrap_err();
        assert!(matches!(err, PromoStoreError::DuplicateCode(_)));
        assert!(find_promo_by_code(&conn, "SaLe").unwrap().is_some());
    }

    #[test]
    fn list_newest_first() {
        let conn = test_conn();
        for code in ["AAA", "BBB", "CCC"] {
            create_promo(&conn, &new_promo(code)).unwrap();
        }
        let page = Page::clamp(0, count_promos(&conn).unwrap(), 2);
        let codes: Vec<String> = list_promos(&conn, &page).unwrap().into_iter().map(|p| p.code).collect();
        assert_eq!(codes, vec!["CCC", "BBB"]);
    }

    #[test]
    fn toggle_active() {
        let conn = test_conn();
        let id = create_promo(&conn, &new_promo("TOGGLE")).unwrap();
        assert!(set_promo_active(&conn, id, false).unwrap());
        assert!(!get_promo(&conn, id).unwrap().unwrap().is_active);
        assert!(!set_promo_active(&conn, 999, false).unwrap());
    }

    #[test]
    fn redeem_once_per_client() {
        let conn = test_conn();
        add_client(&conn, 1);
        create_promo(&conn, &new_promo("ONCE")).unwrap();
        let today = date(2025, 5, 5);

        let redeemed = redeem_promo(&conn, "once", 1, None, today).unwrap();
        assert_eq!(redeemed.used_count, 1);

        let err = redeem_promo(&conn, "ONCE", 1, None, today).unwrap_err();
        assert!(matches!(err, PromoStoreError::Rejected(PromoRejection::AlreadyUsed)));
    }

    #[test]
    fn redeem_respects_max_uses() {
        let conn = test_conn();
        let promo = NewPromo {
            max_uses: Some(2),
            ..new_promo("TWO")
        };
        let id = create_promo(&conn, &promo).unwrap();
        let today = date(2025, 5, 5);

        redeem_promo(&conn, "TWO", 1, None, today).unwrap();
        redeem_promo(&conn, "TWO", 2, None, today).unwrap();
        let err = redeem_promo(&conn, "TWO", 3, None, today).unwrap_err();
        assert!(matches!(err, PromoStoreError::Rejected(PromoRejection::Exhausted)));
        assert_eq!(get_promo(&conn, id).unwrap().unwrap().used_count, 2);
    }

    #[test]
    fn redeem_unknown_and_expired() {
        let conn = test_conn();
        let today = date(2025, 5, 5);
        assert!(matches!(
            redeem_promo(&conn, "NOPE", 1, None, today).unwrap_err(),
            PromoStoreError::NotFound
        ));

        let old = NewPromo {
            valid_until: Some(date(2025, 1, 31)),
            ..new_promo("OLD")
        };
        create_promo(&conn, &old).unwrap();
        assert!(matches!(
            redeem_promo(&conn, "OLD", 1, None, today).unwrap_err(),
            PromoStoreError::Rejected(PromoRejection::Expired)
        ));
    }

    #[test]
    fn delete_unused_promo() {
        let conn = test_conn();
        let id = create_promo(&conn, &new_promo("GONE")).unwrap();
        delete_promo(&conn, id).unwrap();
        assert!(get_promo(&conn, id).unwrap().is_none());
        assert!(matches!(delete_promo(&conn, id), Err(PromoStoreError::NotFound)));
    }

    #[test]
    fn delete_refused_when_used_in_order() {
        let conn = test_conn();
        add_client(&conn, 1);
        let id = create_promo(&conn, &new_promo("USED")).unwrap();
        conn.execute(
            "INSERT INTO orders (client_id, status, subtotal, discount, total, promo_code_id)
             VALUES (1, 'paid', 1000, 100, 900, ?1)",
            params![id],
        )
        .unwrap();

        assert!(matches!(delete_promo(&conn, id), Err(PromoStoreError::InUse)));
        assert!(get_promo(&conn, id).unwrap().is_some());
    }
}
