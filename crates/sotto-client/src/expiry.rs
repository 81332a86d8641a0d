//! Time-boxed retention of ephemeral messages.
//!
//! Each message moves through `Active -> Expired -> Purged`. Expiry is
//! detected by a periodic sweep rather than per-message timers, so actual
//! removal lags the nominal expiry timestamp by up to one sweep interval.
//! Every mutation batch (insert, sweep that purged something, clear)
//! re-encrypts the remaining set under the current session key and writes
//! the cache exactly once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use sotto_shared::cipher::SymmetricKey;
use sotto_shared::types::Identity;

use crate::cache::{self, CachedMessage};
use crate::error::Result;

/// Default sweep interval. Bounds how long an expired message can remain
/// visible: at most this long past its expiry timestamp.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Active,
    /// Past its expiry timestamp; removed (purged) by the same sweep that
    /// marked it.
    Expired,
}

/// One ephemeral message held in client memory.
#[derive(Debug, Clone)]
pub struct EphemeralMessage {
    pub sender: Identity,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub expiry_timestamp: DateTime<Utc>,
    state: MessageState,
}

impl EphemeralMessage {
    pub fn new(
        sender: Identity,
        text: String,
        timestamp: DateTime<Utc>,
        expiry_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender,
            text,
            timestamp,
            expiry_timestamp,
            state: MessageState::Active,
        }
    }

    pub fn state(&self) -> MessageState {
        self.state
    }

    fn to_cached(&self) -> CachedMessage {
        CachedMessage {
            sender: self.sender.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp,
            expiry_timestamp: self.expiry_timestamp,
        }
    }

    fn from_cached(cached: CachedMessage) -> Self {
        Self::new(
            cached.sender,
            cached.text,
            cached.timestamp,
            cached.expiry_timestamp,
        )
    }
}

/// The in-memory ephemeral message set plus its encrypted on-disk cache.
pub struct EphemeralSession {
    messages: Vec<EphemeralMessage>,
    cache_path: PathBuf,
    session_key: SymmetricKey,
}

impl EphemeralSession {
    /// Start an empty session; the cache file is created on the first
    /// mutation.
    pub fn new(cache_path: PathBuf, session_key: SymmetricKey) -> Self {
        Self {
            messages: Vec::new(),
            cache_path,
            session_key,
        }
    }

    /// Reopen a session from its cache. Messages whose expiry already
    /// passed are dropped on the spot (and the trimmed set written back).
    /// Fails closed if the blob was sealed under a different key.
    pub fn load(cache_path: PathBuf, session_key: SymmetricKey, now: DateTime<Utc>) -> Result<Self> {
        let mut session = Self::new(cache_path, session_key);
        if !session.cache_path.exists() {
            return Ok(session);
        }

        let cached = cache::read_cache(&session.cache_path, &session.session_key)?;
        let total = cached.len();
        session.messages = cached
            .into_iter()
            .filter(|m| now < m.expiry_timestamp)
            .map(EphemeralMessage::from_cached)
            .collect();

        if session.messages.len() < total {
            debug!(
                dropped = total - session.messages.len(),
                "dropped expired messages while loading cache"
            );
            session.write_back()?;
        }
        Ok(session)
    }

    /// Add a message and re-encrypt the cache.
    pub fn insert(&mut self, message: EphemeralMessage) -> Result<()> {
        self.messages.push(message);
        self.write_back()
    }

    /// One sweep pass: mark messages past their expiry as `Expired`, then
    /// purge them from the set. Returns the number purged; the cache is
    /// rewritten only when something was.
    pub fn sweep_once(&mut self, now: DateTime<Utc>) -> Result<usize> {
        for message in &mut self.messages {
            if message.state == MessageState::Active && now >= message.expiry_timestamp {
                message.state = MessageState::Expired;
            }
        }

        let before = self.messages.len();
        self.messages.retain(|m| m.state == MessageState::Active);
        let purged = before - self.messages.len();

        if purged > 0 {
            debug!(purged, remaining = self.messages.len(), "purged expired messages");
            self.write_back()?;
        }
        Ok(purged)
    }

    /// Messages currently retained (all `Active`; expired entries never
    /// survive the sweep that found them).
    pub fn active_messages(&self) -> &[EphemeralMessage] {
        &self.messages
    }

    /// Explicit "clear chat": purge everything immediately, regardless of
    /// expiry state.
    pub fn clear(&mut self) -> Result<()> {
        self.messages.clear();
        self.write_back()
    }

    /// Keypair rotation: purge everything and re-seal the empty cache
    /// under the freshly derived key. Blobs written under the old key are
    /// unreadable from here on (decryption fails closed).
    pub fn rekey(&mut self, session_key: SymmetricKey) -> Result<()> {
        self.session_key = session_key;
        self.clear()
    }

    fn write_back(&self) -> Result<()> {
        let cached: Vec<CachedMessage> = self.messages.iter().map(|m| m.to_cached()).collect();
        cache::write_cache(&self.cache_path, &self.session_key, &cached)
    }
}

/// Drive [`EphemeralSession::sweep_once`] on a fixed interval.
pub fn spawn_sweeper(
    session: Arc<Mutex<EphemeralSession>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let mut session = session.lock().await;
            if let Err(e) = session.sweep_once(Utc::now()) {
                warn!(error = %e, "ephemeral sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use sotto_shared::error::CryptoError;

    use crate::cache;
    use crate::error::ClientError;

    fn message(text: &str, sent: DateTime<Utc>, ttl_secs: i64) -> EphemeralMessage {
        EphemeralMessage::new(
            Identity::from("alice@example.org"),
            text.to_string(),
            sent,
            sent + chrono::Duration::seconds(ttl_secs),
        )
    }

    fn session(dir: &tempfile::TempDir) -> EphemeralSession {
        EphemeralSession::new(dir.path().join("cache.bin"), [0x42; 32])
    }

    #[test]
    fn test_sweep_purges_expired() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        let now = Utc::now();

        session.insert(message("stays", now, 60)).unwrap();
        session.insert(message("goes", now, 5)).unwrap();

        // nominal expiry of "goes" is now+5s; the sweep at now+6s removes it
        let purged = session
            .sweep_once(now + chrono::Duration::seconds(6))
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(session.active_messages().len(), 1);
        assert_eq!(session.active_messages()[0].text, "stays");
    }

    #[test]
    fn test_removal_lags_by_at_most_one_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        let now = Utc::now();

        session.insert(message("short-lived", now, 5)).unwrap();

        // sweep before expiry: still active
        assert_eq!(session.sweep_once(now + chrono::Duration::seconds(4)).unwrap(), 0);
        assert_eq!(session.active_messages().len(), 1);

        // message expires between sweeps; it survives until the next one
        let purged = session
            .sweep_once(now + chrono::Duration::seconds(7))
            .unwrap();
        assert_eq!(purged, 1);
        assert!(session.active_messages().is_empty());
    }

    #[test]
    fn test_cache_rewritten_after_each_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = [0x42; 32];
        let mut session = EphemeralSession::new(path.clone(), key);
        let now = Utc::now();

        session.insert(message("one", now, 5)).unwrap();
        session.insert(message("two", now, 60)).unwrap();
        assert_eq!(cache::read_cache(&path, &key).unwrap().len(), 2);

        session.sweep_once(now + chrono::Duration::seconds(6)).unwrap();
        let cached = cache::read_cache(&path, &key).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].text, "two");
    }

    #[test]
    fn test_clear_purges_regardless_of_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = [0x42; 32];
        let mut session = EphemeralSession::new(path.clone(), key);

        session.insert(message("fresh", Utc::now(), 3600)).unwrap();
        session.clear().unwrap();

        assert!(session.active_messages().is_empty());
        assert!(cache::read_cache(&path, &key).unwrap().is_empty());
    }

    #[test]
    fn test_load_drops_already_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = [0x42; 32];
        let now = Utc::now();

        {
            let mut session = EphemeralSession::new(path.clone(), key);
            session.insert(message("old", now, 5)).unwrap();
            session.insert(message("new", now, 3600)).unwrap();
        }

        let session =
            EphemeralSession::load(path, key, now + chrono::Duration::seconds(10)).unwrap();
        assert_eq!(session.active_messages().len(), 1);
        assert_eq!(session.active_messages()[0].text, "new");
    }

    #[test]
    fn test_rekey_makes_old_blob_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let old_key = [0x42; 32];
        let new_key = [0x43; 32];
        let now = Utc::now();

        let mut session = EphemeralSession::new(path.clone(), old_key);
        session.insert(message("before rotation", now, 3600)).unwrap();

        // a copy of the blob sealed under the old key
        let old_blob = dir.path().join("old.bin");
        std::fs::copy(&path, &old_blob).unwrap();

        session.rekey(new_key).unwrap();
        assert!(session.active_messages().is_empty());

        // the stale blob fails closed under the rotated key
        assert!(matches!(
            cache::read_cache(&old_blob, &new_key),
            Err(ClientError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_purges_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut inner = EphemeralSession::new(dir.path().join("cache.bin"), [0x42; 32]);
        inner
            .insert(message("doomed", Utc::now() - chrono::Duration::seconds(10), 5))
            .unwrap();
        let session = Arc::new(Mutex::new(inner));

        let handle = spawn_sweeper(session.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(session.lock().await.active_messages().is_empty());
        handle.abort();
    }
}
