//! Directional session key derivation.
//!
//! Both sides compute the same X25519 shared secret from their own keypair
//! and the peer's published public key, then expand it into two BLAKE3
//! subkeys, one per direction. The role (initiator vs responder) is an
//! explicit input so derivation stays a pure function: the initiator's
//! send key equals the responder's receive key and vice versa, with no
//! handshake round-trip. That matters because a message may reach the
//! peer via storage long after the sender disconnected.

use x25519_dalek::PublicKey;

use crate::cipher::SymmetricKey;
use crate::constants::{KDF_CONTEXT_SESSION_I2R, KDF_CONTEXT_SESSION_R2I};
use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKeyBytes};

/// Which side of the session this party is.
/// Never inferred from call order; the caller decides (by convention the
/// sender of the first message is the initiator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Directional symmetric keys for one (local keypair, peer public key) pair.
/// Not persisted; recomputed whenever the peer key is (re-)fetched.
#[derive(Clone)]
pub struct SessionKeys {
    pub send_key: SymmetricKey,
    pub receive_key: SymmetricKey,
}

/// Derive the directional session keys for a peer.
///
/// Deterministic over its inputs, no side effects. Fails with
/// [`CryptoError::InvalidPeerKey`] if the peer key is all-zero or produces
/// a non-contributory shared secret.
pub fn derive_session_keys(
    local: &KeyPair,
    peer_public: &PublicKeyBytes,
    role: Role,
) -> Result<SessionKeys, CryptoError> {
    if peer_public == &[0u8; 32] {
        return Err(CryptoError::InvalidPeerKey);
    }

    let shared = local.secret().diffie_hellman(&PublicKey::from(*peer_public));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPeerKey);
    }

    let local_public = local.public_bytes();
    let (initiator_public, responder_public) = match role {
        Role::Initiator => (local_public, *peer_public),
        Role::Responder => (*peer_public, local_public),
    };

    let i2r = derive_direction_key(
        KDF_CONTEXT_SESSION_I2R,
        shared.as_bytes(),
        &initiator_public,
        &responder_public,
    );
    let r2i = derive_direction_key(
        KDF_CONTEXT_SESSION_R2I,
        shared.as_bytes(),
        &initiator_public,
        &responder_public,
    );

    Ok(match role {
        Role::Initiator => SessionKeys {
            send_key: i2r,
            receive_key: r2i,
        },
        Role::Responder => SessionKeys {
            send_key: r2i,
            receive_key: i2r,
        },
    })
}

// BLAKE3 KDF with domain separation per direction
fn derive_direction_key(
    context: &str,
    shared_secret: &[u8],
    initiator_public: &[u8; 32],
    responder_public: &[u8; 32],
) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(shared_secret);
    hasher.update(initiator_public);
    hasher.update(responder_public);
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}
