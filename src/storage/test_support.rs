//! Fixtures shared by the storage unit tests

use rusqlite::{params, Connection};

use crate::storage::migrations::run_migrations;

/// In-memory database with foreign keys on and the full schema applied
pub(crate) fn test_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

pub(crate) fn add_client(conn: &Connection, telegram_id: i64) {
    conn.execute(
        "INSERT OR IGNORE INTO clients (telegram_id) VALUES (?1)",
        params![telegram_id],
    )
    .unwrap();
}

/// Inserts a product priced in kopecks and returns its ID
pub(crate) fn add_product(conn: &Connection, name: &str, price: i64, cost_price: i64) -> i64 {
    conn.execute(
        "INSERT INTO products (name, price, cost_price, stock) VALUES (?1, ?2, ?3, 100)",
        params![name, price, cost_price],
    )
    .unwrap();
    conn.last_insert_rowid()
}
