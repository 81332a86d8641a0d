use chrono::{DateTime, Utc};
use rusqlite::params;

use sotto_shared::keys::PublicKeyBytes;
use sotto_shared::types::Identity;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::PublicKeyRecord;

impl Database {
    /// Publish (or replace) an identity's public key.
    ///
    /// Overwrite semantics, no history: a client uploading a rotated key
    /// simply replaces the old record.
    pub fn set_public_key(&self, identity: &Identity, public_key: &PublicKeyBytes) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (identity, public_key, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(identity) DO UPDATE SET
                 public_key = excluded.public_key,
                 updated_at = excluded.updated_at",
            params![
                identity.as_str(),
                hex::encode(public_key),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up an identity's published public key.
    pub fn get_public_key(&self, identity: &Identity) -> Result<Option<PublicKeyRecord>> {
        let row = self
            .conn()
            .query_row(
                "SELECT public_key, updated_at FROM users WHERE identity = ?1",
                params![identity.as_str()],
                |row| {
                    let key_hex: String = row.get(0)?;
                    let updated_at: String = row.get(1)?;
                    Ok((key_hex, updated_at))
                },
            );

        let (key_hex, updated_at) = match row {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Sqlite(e)),
        };

        let key_bytes = hex::decode(&key_hex)?;
        if key_bytes.len() != 32 {
            return Err(StoreError::Corrupt(format!(
                "public key for {}: {} bytes",
                identity,
                key_bytes.len()
            )));
        }
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&key_bytes);

        let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))?;

        Ok(Some(PublicKeyRecord {
            identity: identity.clone(),
            public_key,
            updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let db = Database::open_in_memory().unwrap();
        let alice = Identity::from("alice@example.org");

        assert!(db.get_public_key(&alice).unwrap().is_none());

        db.set_public_key(&alice, &[0xAA; 32]).unwrap();
        let record = db.get_public_key(&alice).unwrap().unwrap();
        assert_eq!(record.public_key, [0xAA; 32]);
    }

    #[test]
    fn test_overwrite_replaces_key() {
        let db = Database::open_in_memory().unwrap();
        let alice = Identity::from("alice@example.org");

        db.set_public_key(&alice, &[0xAA; 32]).unwrap();
        db.set_public_key(&alice, &[0xBB; 32]).unwrap();

        let record = db.get_public_key(&alice).unwrap().unwrap();
        assert_eq!(record.public_key, [0xBB; 32]);
    }
}
