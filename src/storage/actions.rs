//! Actions: time-boxed discount campaigns over a set of products

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::pagination::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub discount_percent: u8,
    /// First day of the campaign, inclusive
    pub starts_on: NaiveDate,
    /// Last day of the campaign, inclusive
    pub ends_on: NaiveDate,
    /// Telegram `file_id` of the banner
    pub image_file_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl Action {
    /// Active and `today` falls within the campaign dates
    pub fn is_running(&self, today: NaiveDate) -> bool {
        self.is_active && self.starts_on <= today && today <= self.ends_on
    }

    pub fn status_emoji(&self, today: NaiveDate) -> &'static str {
        if !self.is_active {
            "⚪️"
        } else if today < self.starts_on {
            "🕓"
        } else if today > self.ends_on {
            "⌛️"
        } else {
            "🟢"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub title: String,
    pub description: String,
    pub discount_percent: u8,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

const ACTION_COLUMNS: &str =
    "id, title, description, discount_percent, starts_on, ends_on, image_file_id, is_active, created_at";

fn action_from_row(row: &rusqlite::Row<'_>) -> Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        discount_percent: row.get(3)?,
        starts_on: row.get(4)?,
        ends_on: row.get(5)?,
        image_file_id: row.get(6)?,
        is_active: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
    })
}

/// Inserts an action and returns its ID
pub fn create_action(conn: &Connection, action: &NewAction) -> Result<i64> {
    conn.execute(
        "INSERT INTO actions (title, description, discount_percent, starts_on, ends_on)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action.title,
            action.description,
            action.discount_percent,
            action.starts_on,
            action.ends_on,
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!(
        "Created action '{}' (id={}, {}..{})",
        action.title,
        id,
        action.starts_on,
        action.ends_on
    );
    Ok(id)
}

pub fn get_action(conn: &Connection, id: i64) -> Result<Option<Action>> {
    conn.query_row(
        &format!("SELECT {} FROM actions WHERE id = ?1", ACTION_COLUMNS),
        params![id],
        action_from_row,
    )
    .optional()
}

pub fn count_actions(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COUNT(*) FROM actions", [], |row| row.get(0))
}

/// Lists actions, latest start date first
pub fn list_actions(conn: &Connection, page: &Page) -> Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM actions ORDER BY starts_on DESC, id DESC LIMIT ?1 OFFSET ?2",
        ACTION_COLUMNS
    ))?;
    let actions = stmt
        .query_map(params![page.limit(), page.offset()], action_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(actions)
}

/// Active actions whose date range contains `today`, ending soonest first
pub fn list_running_actions(conn: &Connection, today: NaiveDate) -> Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM actions
         WHERE is_active = 1 AND starts_on <= ?1 AND ends_on >= ?1
         ORDER BY ends_on, id",
        ACTION_COLUMNS
    ))?;
    let actions = stmt
        .query_map(params![today], action_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(actions)
}

pub fn set_action_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE actions SET is_active = ?1 WHERE id = ?2",
        params![active as i32, id],
    )?;
    Ok(changed > 0)
}

/// Deletes an action; its product links go with it
pub fn delete_action(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM actions WHERE id = ?1", params![id])?;
    if deleted > 0 {
        log::info!("Deleted action id={}", id);
    }
    Ok(deleted > 0)
}

/// Stores (or with `None` removes) the banner image
pub fn set_action_image(conn: &Connection, id: i64, file_id: Option<&str>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE actions SET image_file_id = ?1 WHERE id = ?2",
        params![file_id, id],
    )?;
    Ok(changed > 0)
}

/// Links a product to an action. Returns `false` if it was already linked.
pub fn attach_product(conn: &Connection, action_id: i64, product_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO action_products (action_id, product_id) VALUES (?1, ?2)",
        params![action_id, product_id],
    )?;
    Ok(inserted > 0)
}

pub fn detach_product(conn: &Connection, action_id: i64, product_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM action_products WHERE action_id = ?1 AND product_id = ?2",
        params![action_id, product_id],
    )?;
    Ok(deleted > 0)
}

pub fn action_product_ids(conn: &Connection, action_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT product_id FROM action_products WHERE action_id = ?1 ORDER BY product_id")?;
    let ids = stmt
        .query_map(params![action_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>>>()?;
    Ok(ids)
}
