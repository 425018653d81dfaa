//! Sales and profit statistics
//!
//! Every query takes an inclusive `[from, to]` range of calendar days and only
//! counts orders whose status is a sale (paid, shipped, completed).

use chrono::NaiveDate;
use rusqlite::{params, Connection, Result};
use serde::Serialize;

use crate::core::types::OrderStatus;

/// Totals for a period, amounts in kopecks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub orders: u32,
    pub items_sold: u32,
    /// What clients paid, after promo discounts
    pub revenue: i64,
    /// Purchase cost of the items sold
    pub cost: i64,
    /// Promo discounts given
    pub discounts: i64,
    pub profit: i64,
    pub average_check: i64,
}

impl SalesSummary {
    /// Profit as a share of revenue, in percent
    pub fn margin_percent(&self) -> Option<f64> {
        (self.revenue > 0).then(|| self.profit as f64 * 100.0 / self.revenue as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: u32,
    pub revenue: i64,
    pub profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,
    /// Item revenue before promo discounts
    pub revenue: i64,
    pub profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoStats {
    pub code: String,
    pub uses: u32,
    pub discount_given: i64,
    pub revenue: i64,
}

fn sale_filter(alias: &str) -> String {
    format!(
        "{alias}.status IN {} AND date({alias}.created_at) BETWEEN ?1 AND ?2",
        OrderStatus::sale_statuses_sql(),
        alias = alias
    )
}

pub fn sales_summary(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<SalesSummary> {
    let (orders, revenue, discounts): (u32, i64, i64) = conn.query_row(
        &format!(
            "SELECT COUNT(*), COALESCE(SUM(o.total), 0), COALESCE(SUM(o.discount), 0)
             FROM orders o WHERE {}",
            sale_filter("o")
        ),
        params![from, to],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let (items_sold, cost): (u32, i64) = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(oi.quantity), 0), COALESCE(SUM(oi.quantity * oi.cost_price), 0)
             FROM order_items oi JOIN orders o ON o.id = oi.order_id
             WHERE {}",
            sale_filter("o")
        ),
        params![from, to],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(SalesSummary {
        orders,
        items_sold,
        revenue,
        cost,
        discounts,
        profit: revenue - cost,
        average_check: if orders > 0 { revenue / i64::from(orders) } else { 0 },
    })
}

/// Per-day totals, ascending. Days without sales are absent.
pub fn daily_sales(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailySales>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT day, COUNT(*), SUM(total), SUM(total) - SUM(cost) FROM (
             SELECT date(o.created_at) AS day, o.total AS total,
                    (SELECT COALESCE(SUM(quantity * cost_price), 0)
                     FROM order_items WHERE order_id = o.id) AS cost
             FROM orders o WHERE {}
         ) GROUP BY day ORDER BY day",
        sale_filter("o")
    ))?;
    let days = stmt
        .query_map(params![from, to], |row| {
            Ok(DailySales {
                date: row.get(0)?,
                orders: row.get(1)?,
                revenue: row.get(2)?,
                profit: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(days)
}

/// Best sellers by item revenue
pub fn top_products(conn: &Connection, from: NaiveDate, to: NaiveDate, limit: u32) -> Result<Vec<ProductSales>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT p.id, p.name, SUM(oi.quantity), SUM(oi.quantity * oi.price),
                SUM(oi.quantity * (oi.price - oi.cost_price))
         FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         JOIN products p ON p.id = oi.product_id
         WHERE {}
         GROUP BY p.id
         ORDER BY 4 DESC, p.id
         LIMIT ?3",
        sale_filter("o")
    ))?;
    let products = stmt
        .query_map(params![from, to, limit], |row| {
            Ok(ProductSales {
                product_id: row.get(0)?,
                name: row.get(1)?,
                quantity: row.get(2)?,
                revenue: row.get(3)?,
                profit: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(products)
}

/// Orders placed with each promo code, most used first
pub fn promo_effectiveness(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<PromoStats>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT pc.code, COUNT(o.id), SUM(o.discount), SUM(o.total)
         FROM orders o JOIN promo_codes pc ON pc.id = o.promo_code_id
         WHERE {}
         GROUP BY pc.id
         ORDER BY 2 DESC, pc.code",
        sale_filter("o")
    ))?;
    let promos = stmt
        .query_map(params![from, to], |row| {
            Ok(PromoStats {
                code: row.get(0)?,
                uses: row.get(1)?,
                discount_given: row.get(2)?,
                revenue: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(promos)
}

/// Clients who first contacted the bot within the range
pub fn new_clients(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM clients WHERE date(registered_at) BETWEEN ?1 AND ?2",
        params![from, to],
        |row| row.get(0),
    )
}
