//! Orders as written by the storefront and read by statistics
//!
//! The admin bot never creates orders itself; [`create_order`] is the shared
//! insert routine so both sides compute totals the same way.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::promo::apply_discount;
use crate::core::types::OrderStatus;
use crate::storage::promo::{attach_usage_to_order, redeem_promo, PromoStoreError};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order has no items")]
    Empty,

    #[error("unknown product {0}")]
    UnknownProduct(i64),

    #[error("invalid quantity {0}")]
    InvalidQuantity(u32),

    #[error(transparent)]
    Promo(#[from] PromoStoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    pub status: OrderStatus,
    /// Sum of item prices, kopecks
    pub subtotal: i64,
    /// Promo code discount, kopecks
    pub discount: i64,
    /// What the client pays, kopecks
    pub total: i64,
    pub promo_code_id: Option<i64>,
    pub created_at: String,
}

/// Best discount among actions running on the day of the order that include the product
fn action_discount(conn: &Connection, product_id: i64, day: chrono::NaiveDate) -> rusqlite::Result<u8> {
    let percent: Option<u8> = conn.query_row(
        "SELECT MAX(a.discount_percent) FROM actions a
         JOIN action_products ap ON ap.action_id = a.id
         WHERE ap.product_id = ?1 AND a.is_active = 1 AND a.starts_on <= ?2 AND a.ends_on >= ?2",
        params![product_id, day],
        |row| row.get(0),
    )?;
    Ok(percent.unwrap_or(0))
}

/// Creates an order in one transaction.
///
/// Item prices and costs are copied from the catalog at `placed_at`, with the
/// largest running action discount applied per unit. A promo code, if given,
/// is redeemed for the client and its discount applied to the subtotal. Any
/// failure rolls the whole order back, promo usage included.
pub fn create_order(
    conn: &Connection,
    client_id: i64,
    lines: &[OrderLine],
    promo_code: Option<&str>,
    status: OrderStatus,
    placed_at: NaiveDateTime,
) -> Result<i64, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::Empty);
    }

    let tx = conn.unchecked_transaction()?;
    let day = placed_at.date();

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = 0i64;
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity(line.quantity));
        }
        let (price, cost): (i64, i64) = tx
            .query_row(
                "SELECT price, cost_price FROM products WHERE id = ?1",
                params![line.product_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(OrderError::UnknownProduct(line.product_id))?;

        let (_, unit_price) = apply_discount(price, action_discount(&tx, line.product_id, day)?);
        subtotal += unit_price * i64::from(line.quantity);
        priced.push((line, unit_price, cost));
    }

    let promo = match promo_code {
        Some(code) => Some(redeem_promo(&tx, code, client_id, None, day)?),
        None => None,
    };
    let (discount, total) = match &promo {
        Some(promo) => apply_discount(subtotal, promo.discount_percent),
        None => (0, subtotal),
    };

    tx.execute(
        "INSERT INTO orders (client_id, status, subtotal, discount, total, promo_code_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            client_id,
            status,
            subtotal,
            discount,
            total,
            promo.as_ref().map(|p| p.id),
            placed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    let order_id = tx.last_insert_rowid();

    for (line, price, cost) in priced {
        tx.execute(
            "INSERT INTO order_items (order_id, product_id, quantity, price, cost_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![order_id, line.product_id, line.quantity, price, cost],
        )?;
    }

    if let Some(promo) = &promo {
        attach_usage_to_order(&tx, promo.id, client_id, order_id)?;
    }

    tx.commit()?;
    log::info!(
        "🧾 Order {} for client {}: total {} (discount {})",
        order_id,
        client_id,
        total,
        discount
    );
    Ok(order_id)
}

pub fn get_order(conn: &Connection, id: i64) -> rusqlite::Result<Option<Order>> {
    conn.query_row(
        "SELECT id, client_id, status, subtotal, discount, total, promo_code_id, created_at
         FROM orders WHERE id = ?1",
        params![id],
        order_from_row,
    )
    .optional()
}

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        client_id: row.get(1)?,
        status: row.get(2)?,
        subtotal: row.get(3)?,
        discount: row.get(4)?,
        total: row.get(5)?,
        promo_code_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn set_order_status(conn: &Connection, id: i64, status: OrderStatus) -> rusqlite::Result<bool> {
    let changed = conn.execute("UPDATE orders SET status = ?1 WHERE id = ?2", params![status, id])?;
    Ok(changed > 0)
}

/// Latest orders of a client, newest first
pub fn list_client_orders(conn: &Connection, client_id: i64, limit: u32) -> rusqlite::Result<Vec<Order>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, status, subtotal, discount, total, promo_code_id, created_at
         FROM orders WHERE client_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let orders = stmt
        .query_map(params![client_id, limit], order_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::promo::PromoRejection;
    use crate::storage::actions::{attach_product, create_action, NewAction};
    use crate::storage::promo::{create_promo, find_promo_by_code, NewPromo};
    use crate::storage::test_support::{add_client, add_product, test_conn};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn line(product_id: i64, quantity: u32) -> OrderLine {
        OrderLine { product_id, quantity }
    }

    #[test]
    fn totals_snapshot_catalog_prices() {
        let conn = test_conn();
        add_client(&conn, 1);
        let soap = add_product(&conn, "Мыло", 25_000, 10_000);
        let salt = add_product(&conn, "Соль", 40_000, 15_000);

        let id = create_order(
            &conn,
            1,
            &[line(soap, 2), line(salt, 1)],
            None,
            OrderStatus::Paid,
            at(2025, 3, 3),
        )
        .unwrap();

        let order = get_order(&conn, id).unwrap().unwrap();
        assert_eq!(order.subtotal, 90_000);
        assert_eq!(order.discount, 0);
        assert_eq!(order.total, 90_000);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.created_at, "2025-03-03 12:00:00");

        // later price changes do not touch the stored order
        conn.execute("UPDATE products SET price = 1 WHERE id = ?1", params![soap])
            .unwrap();
        let stored: i64 = conn
            .query_row(
                "SELECT price FROM order_items WHERE order_id = ?1 AND product_id = ?2",
                params![id, soap],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 25_000);
    }

    #[test]
    fn promo_discount_applied_and_recorded() {
        let conn = test_conn();
        add_client(&conn, 1);
        let soap = add_product(&conn, "Мыло", 33_333, 10_000);
        create_promo(
            &conn,
            &NewPromo {
                code: "TEN".to_string(),
                discount_percent: 10,
                max_uses: None,
                valid_from: None,
                valid_until: None,
            },
        )
        .unwrap();

        let id = create_order(&conn, 1, &[line(soap, 1)], Some("ten"), OrderStatus::New, at(2025, 3, 3)).unwrap();
        let order = get_order(&conn, id).unwrap().unwrap();
        assert_eq!(order.discount, 3_333);
        assert_eq!(order.total, 30_000);

        let promo = find_promo_by_code(&conn, "TEN").unwrap().unwrap();
        assert_eq!(order.promo_code_id, Some(promo.id));
        assert_eq!(promo.used_count, 1);
        let usage_order: Option<i64> = conn
            .query_row("SELECT order_id FROM promo_usages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(usage_order, Some(id));
    }

    #[test]
    fn rejected_promo_rolls_back_order() {
        let conn = test_conn();
        add_client(&conn, 1);
        let soap = add_product(&conn, "Мыло", 10_000, 5_000);
        create_promo(
            &conn,
            &NewPromo {
                code: "ONCE".to_string(),
                discount_percent: 50,
                max_uses: None,
                valid_from: None,
                valid_until: None,
            },
        )
        .unwrap();

        create_order(&conn, 1, &[line(soap, 1)], Some("ONCE"), OrderStatus::Paid, at(2025, 3, 3)).unwrap();
        let err = create_order(&conn, 1, &[line(soap, 1)], Some("ONCE"), OrderStatus::Paid, at(2025, 3, 4))
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Promo(PromoStoreError::Rejected(PromoRejection::AlreadyUsed))
        ));

        let orders: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0)).unwrap();
        assert_eq!(orders, 1);
    }

    #[test]
    fn unknown_product_and_empty_cart() {
        let conn = test_conn();
        add_client(&conn, 1);
        assert!(matches!(
            create_order(&conn, 1, &[], None, OrderStatus::New, at(2025, 1, 1)),
            Err(OrderError::Empty)
        ));
        assert!(matches!(
            create_order(&conn, 1, &[line(77, 1)], None, OrderStatus::New, at(2025, 1, 1)),
            Err(OrderError::UnknownProduct(77))
        ));
    }

    #[test]
    fn running_action_lowers_unit_price() {
        let conn = test_conn();
        add_client(&conn, 1);
        let tea = add_product(&conn, "Чай", 20_000, 8_000);
        let action = create_action(
            &conn,
            &NewAction {
                title: "Чайная неделя".to_string(),
                description: String::new(),
                discount_percent: 25,
                starts_on: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                ends_on: NaiveDate::from_ymd_opt(2025, 4, 7).unwrap(),
            },
        )
        .unwrap();
        attach_product(&conn, action, tea).unwrap();

        let during = create_order(&conn, 1, &[line(tea, 2)], None, OrderStatus::Paid, at(2025, 4, 3)).unwrap();
        let after = create_order(&conn, 1, &[line(tea, 2)], None, OrderStatus::Paid, at(2025, 4, 8)).unwrap();
        assert_eq!(get_order(&conn, during).unwrap().unwrap().total, 30_000);
        assert_eq!(get_order(&conn, after).unwrap().unwrap().total, 40_000);
    }

    #[test]
    fn status_update_and_client_history() {
        let conn = test_conn();
        add_client(&conn, 5);
        let soap = add_product(&conn, "Мыло", 10_000, 5_000);
        let first = create_order(&conn, 5, &[line(soap, 1)], None, OrderStatus::New, at(2025, 1, 1)).unwrap();
        let second = create_order(&conn, 5, &[line(soap, 1)], None, OrderStatus::New, at(2025, 1, 2)).unwrap();

        assert!(set_order_status(&conn, first, OrderStatus::Cancelled).unwrap());
        let history = list_client_orders(&conn, 5, 10).unwrap();
        assert_eq!(history.iter().map(|o| o.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(history[1].status, OrderStatus::Cancelled);
    }
}
