//! Encrypted local message cache.
//!
//! The ephemeral message set is serialized to JSON and sealed with the
//! session key before touching disk, nonce prepended (24 bytes). A blob
//! written under one key is unreadable under any other: after a keypair
//! rotation, decryption fails closed instead of yielding stale plaintext.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sotto_shared::cipher::{self, SymmetricKey};
use sotto_shared::constants::NONCE_SIZE;
use sotto_shared::error::CryptoError;
use sotto_shared::types::Identity;

use crate::error::Result;

/// Cache payload -- serialized to JSON then encrypted client-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachePayload {
    /// When this cache file was written
    pub created_at: DateTime<Utc>,
    /// App version that produced the cache
    pub version: String,
    pub messages: Vec<CachedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMessage {
    pub sender: Identity,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub expiry_timestamp: DateTime<Utc>,
}

/// Seal the message set and write it out. One write per mutation batch;
/// this is the only side effect of a cache update.
pub fn write_cache(path: &Path, key: &SymmetricKey, messages: &[CachedMessage]) -> Result<()> {
    let payload = CachePayload {
        created_at: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        messages: messages.to_vec(),
    };

    let json = serde_json::to_vec(&payload)?;
    let sealed = cipher::encrypt(key, &json)?;

    let mut data = Vec::with_capacity(NONCE_SIZE + sealed.ciphertext.len());
    data.extend_from_slice(&sealed.nonce);
    data.extend_from_slice(&sealed.ciphertext);
    std::fs::write(path, data)?;
    Ok(())
}

/// Read and open the cache blob. Fails closed with
/// [`CryptoError::AuthenticationFailed`] if the blob was sealed under a
/// different key (e.g. before a rotation) or was tampered with.
pub fn read_cache(path: &Path, key: &SymmetricKey) -> Result<Vec<CachedMessage>> {
    let data = std::fs::read(path)?;
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::AuthenticationFailed.into());
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let json = cipher::decrypt(key, ciphertext, nonce)?;
    let payload: CachePayload = serde_json::from_slice(&json)?;
    Ok(payload.messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ClientError;

    fn message(text: &str) -> CachedMessage {
        CachedMessage {
            sender: Identity::from("alice@example.org"),
            text: text.to_string(),
            timestamp: Utc::now(),
            expiry_timestamp: Utc::now() + chrono::Duration::seconds(30),
        }
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = [0x11; 32];

        write_cache(&path, &key, &[message("hello"), message("world")]).unwrap();
        let messages = read_cache(&path, &key).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        write_cache(&path, &[0x11; 32], &[message("secret")]).unwrap();
        let result = read_cache(&path, &[0x22; 32]);
        assert!(matches!(
            result,
            Err(ClientError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_truncated_blob_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();

        assert!(matches!(
            read_cache(&path, &[0x11; 32]),
            Err(ClientError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }
}
