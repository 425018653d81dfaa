//! Conversation log between the shop and its clients

use rusqlite::{params, Connection, Result};

use crate::core::types::MessageDirection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub id: i64,
    pub client_id: i64,
    pub direction: MessageDirection,
    pub body: String,
    /// Admin who wrote an outgoing message
    pub admin_id: Option<i64>,
    /// `false` when Telegram refused delivery
    pub delivered: bool,
    pub created_at: String,
}

/// Records a message and returns its ID
pub fn save_message(
    conn: &Connection,
    client_id: i64,
    direction: MessageDirection,
    body: &str,
    admin_id: Option<i64>,
    delivered: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO client_messages (client_id, direction, body, admin_id, delivered)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![client_id, direction, body, admin_id, delivered as i32],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The last `limit` messages with a client, oldest first
pub fn list_conversation(conn: &Connection, client_id: i64, limit: u32) -> Result<Vec<ClientMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, direction, body, admin_id, delivered, created_at FROM (
             SELECT * FROM client_messages WHERE client_id = ?1 ORDER BY id DESC LIMIT ?2
         ) ORDER BY id",
    )?;
    let messages = stmt
        .query_map(params![client_id, limit], |row| {
            Ok(ClientMessage {
                id: row.get(0)?,
                client_id: row.get(1)?,
                direction: row.get(2)?,
                body: row.get(3)?,
                admin_id: row.get(4)?,
                delivered: row.get::<_, i32>(5)? != 0,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(messages)
}

/// Clients whose latest message is incoming, i.e. still waiting for a reply.
///
/// `since` limits the count to conversations active after that timestamp
/// (`YYYY-MM-DD HH:MM:SS`).
pub fn count_unanswered(conn: &Connection, since: &str) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM client_messages m
         WHERE m.id = (SELECT MAX(id) FROM client_messages WHERE client_id = m.client_id)
           AND m.direction = 'in'
           AND m.created_at >= ?1",
        params![since],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::test_conn;

    #[test]
    fn conversation_keeps_latest_in_order() {
        let conn = test_conn();
        for i in 0..6 {
            let direction = if i % 2 == 0 {
                MessageDirection::Incoming
            } else {
                MessageDirection::Outgoing
            };
            save_message(&conn, 10, direction, &format!("msg {}", i), None, true).unwrap();
        }
        save_message(&conn, 11, MessageDirection::Incoming, "other client", None, true).unwrap();

        let bodies: Vec<String> = list_conversation(&conn, 10, 3)
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["msg 3", "msg 4", "msg 5"]);
    }

    #[test]
    fn outgoing_metadata_round_trips() {
        let conn = test_conn();
        save_message(&conn, 3, MessageDirection::Outgoing, "Ваш заказ готов", Some(99), false).unwrap();
        let message = &list_conversation(&conn, 3, 5).unwrap()[0];
        assert_eq!(message.direction, MessageDirection::Outgoing);
        assert_eq!(message.admin_id, Some(99));
        assert!(!message.delivered);
    }

    #[test]
    fn unanswered_counts_clients_waiting_for_reply() {
        let conn = test_conn();
        save_message(&conn, 1, MessageDirection::Incoming, "Здравствуйте", None, true).unwrap();
        save_message(&conn, 1, MessageDirection::Outgoing, "Добрый день", Some(9), true).unwrap();
        save_message(&conn, 2, MessageDirection::Incoming, "Есть в наличии?", None, true).unwrap();
        save_message(&conn, 3, MessageDirection::Incoming, "Алло", None, true).unwrap();
        save_message(&conn, 3, MessageDirection::Incoming, "Алло?", None, true).unwrap();

        assert_eq!(count_unanswered(&conn, "2000-01-01 00:00:00").unwrap(), 2);
        assert_eq!(count_unanswered(&conn, "2999-01-01 00:00:00").unwrap(), 0);
    }
}
