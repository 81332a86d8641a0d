//! # sotto-store
//!
//! Durable server-side storage for the Sotto relay, backed by SQLite.
//!
//! The relay treats this crate as an opaque capability: append ciphertext
//! records keyed by recipient, list them back in timestamp order, and hold
//! the public-key directory (one record per identity, overwrite semantics).
//! Nothing stored here is ever plaintext.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
