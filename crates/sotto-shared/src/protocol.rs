//! Wire protocol for the real-time transport.
//!
//! Frames are JSON text messages over the WebSocket connection. Ciphertext
//! and nonce are byte arrays; the relay never interprets them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Identity;

/// An encrypted message pushed to a recipient's live connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePush {
    /// Verified identity of the sender (bound at handshake, not client-supplied)
    pub sender: Identity,
    /// Opaque ciphertext
    pub ciphertext: Vec<u8>,
    /// AEAD nonce the ciphertext was sealed under
    pub nonce: Vec<u8>,
    /// Server-assigned send timestamp
    pub timestamp: DateTime<Utc>,
    /// Present in ephemeral mode only; the recipient purges the message
    /// once this instant has passed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_timestamp: Option<DateTime<Utc>>,
}

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Must be the first frame on a new connection. The token is resolved
    /// to a verified identity by the authentication collaborator before
    /// any relay operation is permitted.
    Hello { token: String },

    /// Send an encrypted message to a peer. `expiry_timestamp` selects
    /// ephemeral mode: the relay will not persist the message.
    Send {
        to: Identity,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expiry_timestamp: Option<DateTime<Utc>>,
    },
}

/// Frames sent by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake accepted; the connection is bound to this identity.
    Welcome { identity: Identity },

    /// An encrypted message for this connection's identity.
    Message(MessagePush),

    /// Outcome of a `Send` frame. `delivered` reflects live delivery,
    /// `stored` durable persistence; the two are independent.
    Ack { delivered: bool, stored: bool },

    /// A newer connection registered for the same identity; this one will
    /// receive no further deliveries.
    SessionReplaced,

    /// Request-level failure (bad frame, send rejected).
    Error { message: String },
}

impl ClientFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_frame_roundtrip() {
        let frame = ClientFrame::Send {
            to: Identity::from("bob@example.org"),
            ciphertext: vec![1, 2, 3],
            nonce: vec![9; 24],
            expiry_timestamp: None,
        };

        let json = frame.to_json().unwrap();
        // standard mode leaves the expiry out entirely
        assert!(!json.contains("expiry_timestamp"));

        match ClientFrame::from_json(&json).unwrap() {
            ClientFrame::Send { to, ciphertext, .. } => {
                assert_eq!(to.as_str(), "bob@example.org");
                assert_eq!(ciphertext, vec![1, 2, 3]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_ephemeral_send_frame_keeps_expiry() {
        let expiry = Utc::now() + chrono::Duration::seconds(30);
        let frame = ClientFrame::Send {
            to: Identity::from("bob@example.org"),
            ciphertext: vec![7],
            nonce: vec![0; 24],
            expiry_timestamp: Some(expiry),
        };

        let json = frame.to_json().unwrap();
        match ClientFrame::from_json(&json).unwrap() {
            ClientFrame::Send {
                expiry_timestamp, ..
            } => assert_eq!(expiry_timestamp, Some(expiry)),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_server_frame_tags() {
        let welcome = ServerFrame::Welcome {
            identity: Identity::from("alice@example.org"),
        };
        assert!(welcome.to_json().unwrap().contains("\"type\":\"welcome\""));

        let replaced = ServerFrame::SessionReplaced;
        assert!(replaced
            .to_json()
            .unwrap()
            .contains("\"type\":\"session_replaced\""));
    }

    #[test]
    fn test_message_push_roundtrip() {
        let push = MessagePush {
            sender: Identity::from("alice@example.org"),
            ciphertext: vec![4, 5, 6],
            nonce: vec![1; 24],
            timestamp: Utc::now(),
            expiry_timestamp: None,
        };

        let json = ServerFrame::Message(push).to_json().unwrap();
        match ServerFrame::from_json(&json).unwrap() {
            ServerFrame::Message(m) => assert_eq!(m.ciphertext, vec![4, 5, 6]),
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
