//! Local keystore.
//!
//! Holds the user's long-term X25519 keypair, generated on first run and
//! persisted as a JSON export file. Peer public keys are fetched from the
//! directory on every derivation: nothing is cached, so a peer's key
//! rotation is picked up the next time a session is derived.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::info;

use sotto_shared::error::KeyError;
use sotto_shared::keys::{KeyPair, KeyPairExport, PublicKeyBytes};
use sotto_shared::session::{derive_session_keys, Role, SessionKeys};
use sotto_shared::types::Identity;

use crate::directory::KeyDirectory;
use crate::error::{ClientError, Result};

pub struct KeyStore {
    identity: Identity,
    keypair: KeyPair,
    path: PathBuf,
}

impl KeyStore {
    /// Open the keystore at the platform-default path:
    /// - Linux:   `~/.local/share/sotto/keypair.json`
    /// - macOS:   `~/Library/Application Support/com.sotto.sotto/keypair.json`
    pub fn open_default(identity: Identity) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "sotto", "sotto").ok_or(ClientError::NoDataDir)?;
        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Self::open_at(identity, &data_dir.join("keypair.json"))
    }

    /// Load the keypair at `path`, generating and persisting a fresh one
    /// on first run.
    pub fn open_at(identity: Identity, path: &Path) -> Result<Self> {
        let keypair = if path.exists() {
            let json = std::fs::read_to_string(path)?;
            let export: KeyPairExport = serde_json::from_str(&json)
                .map_err(|e| KeyError::KeyFile(format!("{}: {e}", path.display())))?;
            KeyPair::from_export(&export)
        } else {
            info!(identity = %identity, path = %path.display(), "generating new keypair");
            let keypair = KeyPair::generate();
            write_export(path, &keypair)?;
            keypair
        };

        Ok(Self {
            identity,
            keypair,
            path: path.to_path_buf(),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn public_bytes(&self) -> PublicKeyBytes {
        self.keypair.public_bytes()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Publish the local public key to the directory (overwrite semantics).
    pub fn publish(&self, directory: &dyn KeyDirectory) -> Result<()> {
        directory.set_public_key(&self.identity, &self.public_bytes())?;
        Ok(())
    }

    /// Fetch the peer's current public key and derive fresh session keys.
    ///
    /// Performed per call by design: if the peer rotated its keypair since
    /// the last message, this derivation picks up the new key and the old
    /// session keys are simply never used again.
    pub fn session_with(
        &self,
        directory: &dyn KeyDirectory,
        peer: &Identity,
        role: Role,
    ) -> Result<SessionKeys> {
        let peer_key = directory.get_public_key(peer)?;
        Ok(derive_session_keys(&self.keypair, &peer_key, role)?)
    }

    /// Explicit user-initiated rotation: generate a new keypair, persist
    /// it, and publish the new public key. Every previously derived
    /// session key is invalidated from this point on.
    pub fn rotate(&mut self, directory: &dyn KeyDirectory) -> Result<()> {
        info!(identity = %self.identity, "rotating keypair");
        self.keypair = KeyPair::generate();
        write_export(&self.path, &self.keypair)?;
        self.publish(directory)
    }
}

fn write_export(path: &Path, keypair: &KeyPair) -> Result<()> {
    let json = serde_json::to_string_pretty(&keypair.to_export())?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::directory::InMemoryDirectory;

    #[test]
    fn test_keypair_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        let alice = Identity::from("alice@example.org");

        let first = KeyStore::open_at(alice.clone(), &path).unwrap();
        let second = KeyStore::open_at(alice, &path).unwrap();
        assert_eq!(first.public_bytes(), second.public_bytes());
    }

    #[test]
    fn test_corrupt_key_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        std::fs::write(&path, "not a key export").unwrap();

        let result = KeyStore::open_at(Identity::from("alice@example.org"), &path);
        assert!(matches!(
            result,
            Err(ClientError::Key(KeyError::KeyFile(_)))
        ));
    }

    #[test]
    fn test_publish_and_derive() {
        let dir = tempfile::tempdir().unwrap();
        let directory = InMemoryDirectory::new();

        let alice = KeyStore::open_at(
            Identity::from("alice@example.org"),
            &dir.path().join("alice.json"),
        )
        .unwrap();
        let bob = KeyStore::open_at(
            Identity::from("bob@example.org"),
            &dir.path().join("bob.json"),
        )
        .unwrap();
        alice.publish(&directory).unwrap();
        bob.publish(&directory).unwrap();

        let a = alice
            .session_with(&directory, bob.identity(), Role::Initiator)
            .unwrap();
        let b = bob
            .session_with(&directory, alice.identity(), Role::Responder)
            .unwrap();
        assert_eq!(a.send_key, b.receive_key);
        assert_eq!(a.receive_key, b.send_key);
    }

    #[test]
    fn test_unpublished_peer_aborts_derivation() {
        let dir = tempfile::tempdir().unwrap();
        let directory = InMemoryDirectory::new();

        let alice = KeyStore::open_at(
            Identity::from("alice@example.org"),
            &dir.path().join("alice.json"),
        )
        .unwrap();

        let result = alice.session_with(
            &directory,
            &Identity::from("nobody@example.org"),
            Role::Initiator,
        );
        assert!(matches!(result, Err(ClientError::Directory(_))));
    }

    #[test]
    fn test_rotation_changes_published_key_and_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let directory = InMemoryDirectory::new();

        let mut alice = KeyStore::open_at(
            Identity::from("alice@example.org"),
            &dir.path().join("alice.json"),
        )
        .unwrap();
        let bob = KeyStore::open_at(
            Identity::from("bob@example.org"),
            &dir.path().join("bob.json"),
        )
        .unwrap();
        alice.publish(&directory).unwrap();
        bob.publish(&directory).unwrap();

        let before = bob
            .session_with(&directory, alice.identity(), Role::Responder)
            .unwrap();

        let old_public = alice.public_bytes();
        alice.rotate(&directory).unwrap();
        assert_ne!(alice.public_bytes(), old_public);
        assert_eq!(
            directory.get_public_key(alice.identity()).unwrap(),
            alice.public_bytes()
        );

        // bob's next derivation picks up the rotated key
        let after = bob
            .session_with(&directory, alice.identity(), Role::Responder)
            .unwrap();
        assert_ne!(before.receive_key, after.receive_key);
    }
}
