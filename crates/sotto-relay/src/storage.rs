//! Storage capability for the relay.
//!
//! The relay never touches SQL directly; it appends and lists opaque
//! ciphertext records through the [`MessageStore`] trait. The production
//! implementation wraps the `sotto-store` database; the in-memory
//! implementation backs tests and zero-setup local runs.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use sotto_shared::types::Identity;
use sotto_store::{Database, StoredMessage};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A message accepted for durable persistence.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: Identity,
    pub recipient: Identity,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only ciphertext storage keyed by recipient.
pub trait MessageStore: Send + Sync {
    /// Durably append one record.
    fn append(&self, message: &NewMessage) -> Result<(), StorageError>;

    /// List records for a recipient, ascending by timestamp
    /// (append order breaking ties).
    fn list_for_recipient(&self, recipient: &Identity) -> Result<Vec<StoredMessage>, StorageError>;
}

/// SQLite-backed message store.
///
/// Shares the relay's single [`Database`] handle with the public-key
/// directory endpoints.
pub struct SqliteMessageStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteMessageStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn db(&self) -> Result<std::sync::MutexGuard<'_, Database>, StorageError> {
        self.db
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))
    }
}

impl MessageStore for SqliteMessageStore {
    fn append(&self, message: &NewMessage) -> Result<(), StorageError> {
        self.db()?
            .append_message(
                &message.sender,
                &message.recipient,
                &message.ciphertext,
                &message.nonce,
                message.timestamp,
            )
            .map(|_| ())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn list_for_recipient(&self, recipient: &Identity) -> Result<Vec<StoredMessage>, StorageError> {
        self.db()?
            .list_messages_for_recipient(recipient)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

/// In-memory message store for tests and local development.
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for InMemoryMessageStore {
    fn append(&self, message: &NewMessage) -> Result<(), StorageError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        let id = messages.len() as i64 + 1;
        messages.push(StoredMessage {
            id,
            sender: message.sender.clone(),
            recipient: message.recipient.clone(),
            ciphertext: message.ciphertext.clone(),
            nonce: message.nonce.clone(),
            timestamp: message.timestamp,
        });
        Ok(())
    }

    fn list_for_recipient(&self, recipient: &Identity) -> Result<Vec<StoredMessage>, StorageError> {
        let messages = self
            .messages
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        let mut result: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| &m.recipient == recipient)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_store_roundtrip() {
        let store = SqliteMessageStore::new(Arc::new(Mutex::new(
            Database::open_in_memory().unwrap(),
        )));
        let alice = Identity::from("alice@example.org");
        let bob = Identity::from("bob@example.org");

        store
            .append(&NewMessage {
                sender: alice.clone(),
                recipient: bob.clone(),
                ciphertext: vec![1, 2, 3],
                nonce: vec![0; 24],
                timestamp: Utc::now(),
            })
            .unwrap();

        let listed = store.list_for_recipient(&bob).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ciphertext, vec![1, 2, 3]);
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let alice = Identity::from("alice@example.org");
        let bob = Identity::from("bob@example.org");

        {
            let store =
                SqliteMessageStore::new(Arc::new(Mutex::new(Database::open_at(&path).unwrap())));
            store
                .append(&NewMessage {
                    sender: alice.clone(),
                    recipient: bob.clone(),
                    ciphertext: vec![0xAB],
                    nonce: vec![0; 24],
                    timestamp: Utc::now(),
                })
                .unwrap();
        }

        let store =
            SqliteMessageStore::new(Arc::new(Mutex::new(Database::open_at(&path).unwrap())));
        let listed = store.list_for_recipient(&bob).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ciphertext, vec![0xAB]);
    }

    #[test]
    fn test_in_memory_store_orders_by_timestamp() {
        let store = InMemoryMessageStore::new();
        let alice = Identity::from("alice@example.org");
        let bob = Identity::from("bob@example.org");
        let base = Utc::now();

        for (offset, payload) in [(10i64, 2u8), (0, 1), (20, 3)] {
            store
                .append(&NewMessage {
                    sender: alice.clone(),
                    recipient: bob.clone(),
                    ciphertext: vec![payload],
                    nonce: vec![0; 24],
                    timestamp: base + chrono::Duration::seconds(offset),
                })
                .unwrap();
        }

        let payloads: Vec<u8> = store
            .list_for_recipient(&bob)
            .unwrap()
            .iter()
            .map(|m| m.ciphertext[0])
            .collect();
        assert_eq!(payloads, vec![1, 2, 3]);
    }
}
