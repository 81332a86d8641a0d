use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid peer public key")]
    InvalidPeerKey,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Authentication failed: ciphertext or nonce rejected")]
    AuthenticationFailed,
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key file error: {0}")]
    KeyFile(String),
}
