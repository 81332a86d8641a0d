use chrono::{DateTime, Utc};
use rusqlite::params;

use sotto_shared::types::Identity;

use crate::database::Database;
use crate::error::Result;
use crate::models::StoredMessage;

impl Database {
    /// Append an opaque ciphertext record keyed by recipient.
    ///
    /// Returns the row id assigned to the record.
    pub fn append_message(
        &self,
        sender: &Identity,
        recipient: &Identity,
        ciphertext: &[u8],
        nonce: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO messages (sender, recipient, ciphertext, nonce, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sender.as_str(),
                recipient.as_str(),
                ciphertext,
                nonce,
                timestamp.to_rfc3339(),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// List all messages stored for a recipient, ascending by timestamp.
    /// Row id breaks ties so append order is preserved.
    pub fn list_messages_for_recipient(&self, recipient: &Identity) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender, recipient, ciphertext, nonce, timestamp
             FROM messages
             WHERE recipient = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![recipient.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let id: i64 = row.get(0)?;
    let sender: String = row.get(1)?;
    let recipient: String = row.get(2)?;
    let ciphertext: Vec<u8> = row.get(3)?;
    let nonce: Vec<u8> = row.get(4)?;
    let ts_str: String = row.get(5)?;

    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(StoredMessage {
        id,
        sender: Identity::new(sender),
        recipient: Identity::new(recipient),
        ciphertext,
        nonce,
        timestamp,
    })
}
