//! # sotto-shared
//!
//! Crypto core and wire protocol types shared between the Sotto relay
//! server and client.
//!
//! The end-to-end encryption model is deliberately small: each user owns a
//! long-term X25519 keypair, a pair of directional session keys is derived
//! per peer via Diffie-Hellman plus a BLAKE3 KDF, and message payloads are
//! sealed with XChaCha20-Poly1305. The relay only ever sees opaque
//! ciphertext.

pub mod cipher;
pub mod constants;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod session;
pub mod types;

pub use error::{CryptoError, KeyError};
pub use types::Identity;
