use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sotto_shared::keys::PublicKeyBytes;
use sotto_shared::types::Identity;

/// A durably stored message record.
///
/// Immutable once appended; never deleted by this subsystem. The row id is
/// the append order and breaks timestamp ties so per-pair FIFO holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub sender: Identity,
    pub recipient: Identity,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// One identity's published public key (overwrite semantics, no history).
#[derive(Debug, Clone)]
pub struct PublicKeyRecord {
    pub identity: Identity,
    pub public_key: PublicKeyBytes,
    pub updated_at: DateTime<Utc>,
}
