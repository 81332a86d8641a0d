//! Real-time message dispatch.
//!
//! One rule drives everything here: delivery and persistence are
//! independent attempts, both made before the sender is acknowledged.
//! Standard-mode messages are durably appended whether or not the
//! recipient was reachable live; ephemeral messages (those carrying an
//! expiry timestamp) are never persisted and are simply dropped when the
//! recipient is offline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use sotto_shared::constants::MAX_MESSAGE_SIZE;
use sotto_shared::protocol::{MessagePush, ServerFrame};
use sotto_shared::types::Identity;
use sotto_store::StoredMessage;

use crate::error::RelayError;
use crate::presence::PresenceDirectory;
use crate::storage::{MessageStore, NewMessage};

/// Outcome of a successful send. An offline recipient is not an error:
/// in standard mode the message is stored for later retrieval, in
/// ephemeral mode it is dropped by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Pushed to the live connection and durably appended.
    DeliveredAndStored,
    /// Recipient offline (or its connection gone); durably appended.
    StoredOnly,
    /// Ephemeral: pushed to the live connection, nothing persisted.
    DeliveredEphemeral,
    /// Ephemeral: recipient offline, message dropped.
    DroppedEphemeral,
}

impl SendOutcome {
    pub fn delivered(self) -> bool {
        matches!(self, Self::DeliveredAndStored | Self::DeliveredEphemeral)
    }

    pub fn stored(self) -> bool {
        matches!(self, Self::DeliveredAndStored | Self::StoredOnly)
    }
}

/// The dispatch core. Holds the injected presence registry and storage
/// capability; owns no ambient state.
pub struct MessageRelay {
    presence: PresenceDirectory,
    store: Arc<dyn MessageStore>,
}

impl MessageRelay {
    pub fn new(presence: PresenceDirectory, store: Arc<dyn MessageStore>) -> Self {
        Self { presence, store }
    }

    /// Dispatch one outgoing ciphertext.
    ///
    /// `sender` is the connection's verified identity, never
    /// client-supplied. A `Some` expiry timestamp selects ephemeral mode.
    pub async fn send(
        &self,
        sender: &Identity,
        recipient: &Identity,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        expiry_timestamp: Option<DateTime<Utc>>,
    ) -> Result<SendOutcome, RelayError> {
        if ciphertext.len() > MAX_MESSAGE_SIZE {
            return Err(RelayError::MessageTooLarge {
                size: ciphertext.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let timestamp = Utc::now();

        let delivered = match self.presence.lookup(recipient).await {
            Some(handle) => handle.push(ServerFrame::Message(MessagePush {
                sender: sender.clone(),
                ciphertext: ciphertext.clone(),
                nonce: nonce.clone(),
                timestamp,
                expiry_timestamp,
            })),
            None => false,
        };

        if expiry_timestamp.is_some() {
            // Ephemeral mode trades durability for non-persistence: the
            // ciphertext must never reach the store, so an offline
            // recipient means the message is gone.
            if delivered {
                debug!(sender = %sender, recipient = %recipient, "ephemeral message delivered");
                Ok(SendOutcome::DeliveredEphemeral)
            } else {
                debug!(sender = %sender, recipient = %recipient, "ephemeral message dropped (recipient offline)");
                Ok(SendOutcome::DroppedEphemeral)
            }
        } else {
            // Durability does not depend on live delivery succeeding.
            let record = NewMessage {
                sender: sender.clone(),
                recipient: recipient.clone(),
                ciphertext,
                nonce,
                timestamp,
            };
            match self.store.append(&record) {
                Ok(()) => {
                    debug!(
                        sender = %sender,
                        recipient = %recipient,
                        delivered,
                        "message stored"
                    );
                    Ok(if delivered {
                        SendOutcome::DeliveredAndStored
                    } else {
                        SendOutcome::StoredOnly
                    })
                }
                Err(source) => {
                    warn!(
                        sender = %sender,
                        recipient = %recipient,
                        delivered,
                        error = %source,
                        "durable append failed"
                    );
                    Err(RelayError::Persistence { delivered, source })
                }
            }
        }
    }

    /// List stored messages for a recipient, ascending by timestamp
    /// (standard mode only; ephemeral messages never appear here).
    pub fn list_for_recipient(&self, recipient: &Identity) -> Result<Vec<StoredMessage>, RelayError> {
        Ok(self.store.list_for_recipient(recipient)?)
    }
}
