//! # sotto-client
//!
//! Client-resident pieces of the Sotto messenger: the local keystore
//! (long-term X25519 keypair plus per-peer session derivation), the key
//! directory capability, and the ephemeral-mode machinery (expiring
//! message set backed by an encrypted local cache).
//!
//! Plaintext exists only inside this crate; everything that crosses the
//! network or touches disk is sealed first.

pub mod cache;
pub mod directory;
pub mod expiry;
pub mod keystore;

mod error;

pub use directory::{DirectoryError, InMemoryDirectory, KeyDirectory};
pub use error::ClientError;
pub use expiry::{EphemeralMessage, EphemeralSession};
pub use keystore::KeyStore;
