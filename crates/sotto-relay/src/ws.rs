//! WebSocket transport for real-time delivery.
//!
//! Each connection runs its own task: an authenticated handshake binds a
//! verified identity to the connection before any relay operation is
//! permitted, then a pump loop moves inbound `Send` frames into the relay
//! and outbound frames (deliveries, acks) onto the socket. Events for a
//! given connection are handled serially; concurrency exists only across
//! connections.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sotto_shared::protocol::{ClientFrame, ServerFrame};
use sotto_shared::types::Identity;

use crate::api::AppState;
use crate::error::RelayError;
use crate::presence::ConnectionHandle;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // -- Handshake: the first frame must be a valid Hello -------------------
    let identity = match await_hello(&mut ws_rx, &state).await {
        Some(identity) => identity,
        None => {
            let _ = send_frame(
                &mut ws_tx,
                &ServerFrame::Error {
                    message: "authentication failed".to_string(),
                },
            )
            .await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(tx);
    let connection_id = handle.id();

    // Last connection wins; tell the displaced one so it stops waiting for
    // deliveries that will never come.
    if let Some(displaced) = state.presence.register(identity.clone(), handle).await {
        debug!(identity = %identity, old = %displaced.id(), "displacing previous connection");
        displaced.push(ServerFrame::SessionReplaced);
    }

    info!(identity = %identity, connection = %connection_id, "connection registered");

    if send_frame(
        &mut ws_tx,
        &ServerFrame::Welcome {
            identity: identity.clone(),
        },
    )
    .await
    .is_err()
    {
        state.presence.unregister(&identity, connection_id).await;
        return;
    }

    // -- Pump loop ----------------------------------------------------------
    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(frame) => {
                    let replaced = matches!(frame, ServerFrame::SessionReplaced);
                    if send_frame(&mut ws_tx, &frame).await.is_err() {
                        break;
                    }
                    if replaced {
                        // This connection no longer owns the presence
                        // entry; close it out.
                        break;
                    }
                }
                None => break,
            },
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_text_frame(&state, &identity, &text).await;
                    if send_frame(&mut ws_tx, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ignore binary/ping/pong
                Some(Err(e)) => {
                    debug!(identity = %identity, error = %e, "websocket error");
                    break;
                }
            }
        }
    }

    // A stale id is a no-op here: if we were displaced, the successor owns
    // the entry.
    state.presence.unregister(&identity, connection_id).await;
    info!(identity = %identity, connection = %connection_id, "connection closed");
}

/// Read frames until a text frame arrives, then require a `Hello` whose
/// token resolves to a verified identity.
async fn await_hello(
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
) -> Option<Identity> {
    loop {
        match ws_rx.next().await? {
            Ok(Message::Text(text)) => {
                return match ClientFrame::from_json(&text) {
                    Ok(ClientFrame::Hello { token }) => {
                        let identity = state.auth.verify(&token);
                        if identity.is_none() {
                            warn!("websocket handshake with invalid token");
                        }
                        identity
                    }
                    Ok(_) => {
                        warn!("websocket frame before handshake");
                        None
                    }
                    Err(e) => {
                        debug!(error = %e, "malformed handshake frame");
                        None
                    }
                };
            }
            Ok(Message::Close(_)) => return None,
            Ok(_) => {} // ignore pre-handshake control frames
            Err(_) => return None,
        }
    }
}

/// Handle one inbound text frame from an authenticated connection.
async fn handle_text_frame(state: &AppState, identity: &Identity, text: &str) -> ServerFrame {
    let frame = match ClientFrame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            return ServerFrame::Error {
                message: format!("malformed frame: {e}"),
            }
        }
    };

    match frame {
        ClientFrame::Hello { .. } => ServerFrame::Error {
            message: "already authenticated".to_string(),
        },
        ClientFrame::Send {
            to,
            ciphertext,
            nonce,
            expiry_timestamp,
        } => {
            match state
                .relay
                .send(identity, &to, ciphertext, nonce, expiry_timestamp)
                .await
            {
                Ok(outcome) => ServerFrame::Ack {
                    delivered: outcome.delivered(),
                    stored: outcome.stored(),
                },
                // Send failures are reported individually; a persistence
                // failure reaches the sender even if live delivery worked.
                Err(RelayError::Persistence { delivered, source }) => ServerFrame::Error {
                    message: format!(
                        "message not stored (live delivery succeeded: {delivered}): {source}"
                    ),
                },
                Err(e) => ServerFrame::Error {
                    message: e.to_string(),
                },
            }
        }
    }
}

async fn send_frame(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let json = frame.to_json().map_err(axum::Error::new)?;
    ws_tx.send(Message::Text(json)).await
}
