//! Key directory capability.
//!
//! The client does not care how peers' public keys are served; it only
//! needs "given an identity, hand me its current public key". The HTTP
//! directory lives in an external collaborator behind this trait.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use sotto_shared::keys::PublicKeyBytes;
use sotto_shared::types::Identity;

#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The peer has not published a key; a send must abort before any
    /// network or storage action.
    #[error("No public key published for {0}")]
    NotFound(Identity),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup and publication of long-term public keys.
pub trait KeyDirectory: Send + Sync {
    fn get_public_key(&self, identity: &Identity) -> Result<PublicKeyBytes, DirectoryError>;

    /// Publish (or replace) an identity's public key. Overwrite
    /// semantics: the directory keeps no history.
    fn set_public_key(
        &self,
        identity: &Identity,
        public_key: &PublicKeyBytes,
    ) -> Result<(), DirectoryError>;
}

/// In-memory directory for tests and single-process setups.
#[derive(Default)]
pub struct InMemoryDirectory {
    keys: Mutex<HashMap<Identity, PublicKeyBytes>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyDirectory for InMemoryDirectory {
    fn get_public_key(&self, identity: &Identity) -> Result<PublicKeyBytes, DirectoryError> {
        self.keys
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))?
            .get(identity)
            .copied()
            .ok_or_else(|| DirectoryError::NotFound(identity.clone()))
    }

    fn set_public_key(
        &self,
        identity: &Identity,
        public_key: &PublicKeyBytes,
    ) -> Result<(), DirectoryError> {
        self.keys
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))?
            .insert(identity.clone(), *public_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_found() {
        let directory = InMemoryDirectory::new();
        let alice = Identity::from("alice@example.org");
        assert!(matches!(
            directory.get_public_key(&alice),
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_then_get() {
        let directory = InMemoryDirectory::new();
        let alice = Identity::from("alice@example.org");

        directory.set_public_key(&alice, &[0xAA; 32]).unwrap();
        assert_eq!(directory.get_public_key(&alice).unwrap(), [0xAA; 32]);

        // overwrite, no history
        directory.set_public_key(&alice, &[0xBB; 32]).unwrap();
        assert_eq!(directory.get_public_key(&alice).unwrap(), [0xBB; 32]);
    }
}
