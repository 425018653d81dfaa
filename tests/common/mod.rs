//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::params;
use serde_json::json;
use shopdesk::core::OrderStatus;
use shopdesk::storage::orders::{create_order, OrderLine};
use shopdesk::storage::products::{create_product, NewProduct};
use shopdesk::storage::{create_pool, db, get_connection, DbConnection, DbPool};
use tempfile::TempDir;
use teloxide::Bot;
use wiremock::matchers::{body_partial_json, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// File-backed database in a temporary directory, migrated through the real pool
pub struct TestDb {
    pub dir: TempDir,
    pub pool: Arc<DbPool>,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        Self {
            dir,
            pool: Arc::new(pool),
        }
    }

    pub fn conn(&self) -> DbConnection {
        get_connection(&self.pool).unwrap()
    }

    pub fn path(&self) -> String {
        self.dir.path().join("shop.sqlite").to_string_lossy().into_owned()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at_noon(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(12, 0, 0).unwrap()
}

pub fn add_client(conn: &rusqlite::Connection, id: i64, username: &str) {
    db::upsert_client(conn, id, Some(username), None).unwrap();
}

/// Product with plenty of stock; prices in kopecks
pub fn add_product(conn: &rusqlite::Connection, name: &str, price: i64, cost_price: i64) -> i64 {
    create_product(
        conn,
        &NewProduct {
            name: name.to_string(),
            description: String::new(),
            price,
            cost_price,
            stock: 100,
        },
    )
    .unwrap()
}

pub fn place_order(
    conn: &rusqlite::Connection,
    client_id: i64,
    lines: &[(i64, u32)],
    promo: Option<&str>,
    status: OrderStatus,
    day: NaiveDate,
) -> i64 {
    let lines: Vec<_> = lines
        .iter()
        .map(|&(product_id, quantity)| OrderLine { product_id, quantity })
        .collect();
    create_order(conn, client_id, &lines, promo, status, at_noon(day)).unwrap()
}

/// Count of logged messages for a client in one direction
pub fn message_count(conn: &rusqlite::Connection, client_id: i64, direction: &str, delivered: bool) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM client_messages WHERE client_id = ?1 AND direction = ?2 AND delivered = ?3",
        params![client_id, direction, delivered as i32],
        |row| row.get(0),
    )
    .unwrap()
}

/// Mock Bot API server: every `sendMessage` succeeds except for the chats
/// listed as blocked, which get Telegram's 403 response
pub struct TelegramMock {
    pub server: MockServer,
}

impl TelegramMock {
    pub async fn start(blocked_chats: &[i64]) -> Self {
        let server = MockServer::start().await;

        for chat_id in blocked_chats {
            Mock::given(method("POST"))
                .and(path_regex(r"(?i)/bot[^/]+/sendmessage$"))
                .and(body_partial_json(json!({ "chat_id": chat_id })))
                .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                    "ok": false,
                    "error_code": 403,
                    "description": "Forbidden: bot was blocked by the user"
                })))
                .with_priority(1)
                .mount(&server)
                .await;
        }

        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/sendmessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {
                    "message_id": 1,
                    "date": 1700000000,
                    "chat": { "id": 1, "type": "private", "first_name": "Test" },
                    "text": "ok"
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/editmessagetext$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {
                    "message_id": 42,
                    "date": 1700000000,
                    "chat": { "id": 1, "type": "private", "first_name": "Test" },
                    "text": "edited"
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/answercallbackquery$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
            .mount(&server)
            .await;

        Self { server }
    }

    /// JSON bodies of every request made to one Bot API method, in order
    pub async fn requests(&self, api_method: &str) -> Vec<serde_json::Value> {
        let suffix = format!("/{}", api_method.to_lowercase());
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().to_lowercase().ends_with(&suffix))
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    pub fn bot(&self) -> Bot {
        Bot::new("12345:TEST_TOKEN").set_api_url(self.server.uri().parse().unwrap())
    }

    /// Number of `sendMessage` requests received so far
    pub async fn sent_messages(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().to_lowercase().ends_with("/sendmessage"))
            .count()
    }
}
