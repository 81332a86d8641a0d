/// Application name
pub const APP_NAME: &str = "Sotto";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// X25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// X25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum message payload size in bytes (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Default HTTP/WebSocket port (relay server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Key derivation contexts (BLAKE3), one per session direction
pub const KDF_CONTEXT_SESSION_I2R: &str = "sotto-session-i2r-v1";
pub const KDF_CONTEXT_SESSION_R2I: &str = "sotto-session-r2i-v1";
