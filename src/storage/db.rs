use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Result};

use crate::core::pagination::Page;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Maximum number of pooled connections
const POOL_MAX_SIZE: u32 = 10;

/// A Telegram user known to the shop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Telegram ID (also the private chat ID)
    pub telegram_id: i64,
    /// Telegram username without `@`, if the user has one
    pub username: Option<String>,
    pub first_name: Option<String>,
    /// Set when the client blocked the bot; such clients are skipped by broadcasts
    pub is_blocked: bool,
    pub registered_at: String,
    pub last_seen_at: String,
}

impl Client {
    /// `@username` when available, otherwise first name, otherwise `ID:…`
    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{}", username),
            (None, Some(name)) if !name.is_empty() => name.clone(),
            _ => format!("ID:{}", self.telegram_id),
        }
    }
}

/// Create a new database connection pool
///
/// Every connection enables foreign keys and a busy timeout; schema migrations
/// run once on the first connection.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use shopdesk::storage::db;
///
/// let pool = db::create_pool("shop.sqlite")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn create_pool(database_path: &str) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;"));
    let pool = Pool::builder().max_size(POOL_MAX_SIZE).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

fn client_from_row(row: &rusqlite::Row<'_>) -> Result<Client> {
    Ok(Client {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        is_blocked: row.get::<_, i32>(3)? != 0,
        registered_at: row.get(4)?,
        last_seen_at: row.get(5)?,
    })
}

const CLIENT_COLUMNS: &str = "telegram_id, username, first_name, is_blocked, registered_at, last_seen_at";

/// Creates a client or refreshes their profile and `last_seen_at`.
///
/// A client who writes to the bot again is evidently not blocking it any
/// more, so the blocked flag is cleared.
///
/// Returns `true` when the client was newly created.
pub fn upsert_client(
    conn: &rusqlite::Connection,
    telegram_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
) -> Result<bool> {
    let existed: bool = conn
        .query_row(
            "SELECT 1 FROM clients WHERE telegram_id = ?1",
            params![telegram_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    conn.execute(
        "INSERT INTO clients (telegram_id, username, first_name)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(telegram_id) DO UPDATE SET
           username = excluded.username,
           first_name = COALESCE(excluded.first_name, first_name),
           is_blocked = 0,
           last_seen_at = CURRENT_TIMESTAMP",
        params![telegram_id, username, first_name],
    )?;

    if !existed {
        log::info!("New client registered: {}", telegram_id);
    }
    Ok(!existed)
}

/// Gets a client by Telegram ID
pub fn get_client(conn: &rusqlite::Connection, telegram_id: i64) -> Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {} FROM clients WHERE telegram_id = ?1", CLIENT_COLUMNS),
        params![telegram_id],
        client_from_row,
    )
    .optional()
}

/// Counts clients; with `only_reachable` blocked clients are excluded
pub fn count_clients(conn: &rusqlite::Connection, only_reachable: bool) -> Result<u32> {
    let sql = if only_reachable {
        "SELECT COUNT(*) FROM clients WHERE is_blocked = 0"
    } else {
        "SELECT COUNT(*) FROM clients"
    };
    conn.query_row(sql, [], |row| row.get(0))
}

/// Lists clients, most recently seen first
pub fn list_clients(conn: &rusqlite::Connection, page: &Page) -> Result<Vec<Client>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM clients ORDER BY last_seen_at DESC, telegram_id DESC LIMIT ?1 OFFSET ?2",
        CLIENT_COLUMNS
    ))?;
    let clients = stmt
        .query_map(params![page.limit(), page.offset()], client_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(clients)
}

/// IDs of every client that has not blocked the bot (broadcast recipients)
pub fn list_reachable_client_ids(conn: &rusqlite::Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT telegram_id FROM clients WHERE is_blocked = 0 ORDER BY telegram_id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Sets or clears the blocked flag. Returns `false` if the client is unknown.
pub fn set_client_blocked(conn: &rusqlite::Connection, telegram_id: i64, blocked: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE clients SET is_blocked = ?1 WHERE telegram_id = ?2",
        params![blocked as i32, telegram_id],
    )?;
    Ok(changed > 0)
}
