use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

/// Raw X25519 public key bytes as published in the directory service.
pub type PublicKeyBytes = [u8; 32];

/// A user's long-term X25519 key-exchange keypair.
/// Created once per client install; the secret half never leaves the client.
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
}

/// Serializable format for storing/exporting a keypair
#[derive(Serialize, Deserialize)]
pub struct KeyPairExport {
    pub secret_key: [u8; 32],
    pub public_key: [u8; 32],
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self { secret }
    }

    /// Restore a keypair from secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(*secret),
        }
    }

    /// Restore a keypair from a serialized export
    pub fn from_export(export: &KeyPairExport) -> Self {
        Self::from_secret_bytes(&export.secret_key)
    }

    /// Get the raw public key bytes
    pub fn public_bytes(&self) -> PublicKeyBytes {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// Get the raw secret key bytes
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Export keypair for serialization
    pub fn to_export(&self) -> KeyPairExport {
        KeyPairExport {
            secret_key: self.secret.to_bytes(),
            public_key: self.public_bytes(),
        }
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret half
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation() {
        let pair = KeyPair::generate();
        assert_ne!(pair.public_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_export_roundtrip() {
        let pair = KeyPair::generate();
        let export = pair.to_export();
        let restored = KeyPair::from_export(&export);
        assert_eq!(pair.public_bytes(), restored.public_bytes());
    }

    #[test]
    fn test_distinct_keypairs() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public_bytes(), b.public_bytes());
    }

    #[test]
    fn test_debug_hides_secret() {
        let pair = KeyPair::generate();
        let debug = format!("{pair:?}");
        assert!(!debug.contains(&hex::encode(pair.secret_bytes())));
    }
}
