//! Client messaging against a mocked Bot API
//!
//! Run with: cargo test --test messaging_test

mod common;

use common::{add_client, message_count, TelegramMock, TestDb};
use shopdesk::storage::db;
use shopdesk::telegram::messaging::{broadcast, deliver, BroadcastReport, Delivery};

#[tokio::test]
async fn deliver_logs_outgoing_message() {
    let db = TestDb::new();
    add_client(&db.conn(), 100, "anna");
    let mock = TelegramMock::start(&[]).await;

    let delivery = deliver(&mock.bot(), &db.pool, Some(1), 100, "Ваш заказ отправлен")
        .await
        .unwrap();

    assert_eq!(delivery, Delivery::Delivered);
    assert_eq!(message_count(&db.conn(), 100, "out", true), 1);
    assert_eq!(mock.sent_messages().await, 1);
}

#[tokio::test]
async fn deliver_to_blocked_client_marks_them() {
    let db = TestDb::new();
    add_client(&db.conn(), 200, "boris");
    let mock = TelegramMock::start(&[200]).await;

    let delivery = deliver(&mock.bot(), &db.pool, Some(1), 200, "Привет").await.unwrap();

    assert_eq!(delivery, Delivery::Blocked);
    let client = db::get_client(&db.conn(), 200).unwrap().unwrap();
    assert!(client.is_blocked);
    // the attempt is still in the conversation log, undelivered
    assert_eq!(message_count(&db.conn(), 200, "out", false), 1);
}

#[tokio::test]
async fn broadcast_skips_known_blocked_and_counts_new_ones() {
    let db = TestDb::new();
    {
        let conn = db.conn();
        add_client(&conn, 1, "a");
        add_client(&conn, 2, "b");
        add_client(&conn, 3, "c");
        add_client(&conn, 4, "d");
        db::set_client_blocked(&conn, 4, true).unwrap();
    }
    // client 3 blocked the bot since we last heard from them
    let mock = TelegramMock::start(&[3]).await;

    let report = broadcast(&mock.bot(), &db.pool, "🔥 Распродажа!").await.unwrap();

    assert_eq!(
        report,
        BroadcastReport {
            sent: 2,
            failed: 0,
            blocked: 1
        }
    );
    // client 4 was never contacted
    assert_eq!(mock.sent_messages().await, 3);
    assert_eq!(db::count_clients(&db.conn(), true).unwrap(), 2);
}

#[tokio::test]
async fn broadcast_without_clients_sends_nothing() {
    let db = TestDb::new();
    let mock = TelegramMock::start(&[]).await;

    let report = broadcast(&mock.bot(), &db.pool, "test").await.unwrap();

    assert_eq!(report, BroadcastReport::default());
    assert_eq!(mock.sent_messages().await, 0);
}

#[tokio::test]
async fn broadcast_keeps_going_when_logging_fails() {
    let db = TestDb::new();
    {
        let conn = db.conn();
        add_client(&conn, 1, "a");
        add_client(&conn, 2, "b");
        conn.execute_batch("DROP TABLE client_messages").unwrap();
    }
    let mock = TelegramMock::start(&[]).await;

    let report = broadcast(&mock.bot(), &db.pool, "Новинки").await.unwrap();

    assert_eq!(
        report,
        BroadcastReport {
            sent: 0,
            failed: 2,
            blocked: 0
        }
    );
    // the first failure did not stop the second client from getting the message
    assert_eq!(mock.sent_messages().await, 2);
}
