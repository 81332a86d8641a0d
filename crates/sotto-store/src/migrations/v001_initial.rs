//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `users` (public-key directory) and
//! `messages` (opaque ciphertext records keyed by recipient).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (public-key directory)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    identity   TEXT PRIMARY KEY NOT NULL,    -- opaque user key (email or UUID)
    public_key TEXT NOT NULL,                -- hex-encoded 32-byte X25519 pubkey
    updated_at TEXT NOT NULL                 -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Messages (standard mode only; ephemeral messages never land here)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    sender     TEXT NOT NULL,                -- sender identity
    recipient  TEXT NOT NULL,                -- recipient identity
    ciphertext BLOB NOT NULL,                -- opaque ciphertext
    nonce      BLOB NOT NULL,                -- AEAD nonce
    timestamp  TEXT NOT NULL                 -- ISO-8601
);

CREATE INDEX IF NOT EXISTS idx_messages_recipient_ts
    ON messages(recipient, timestamp ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
