use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use sotto_shared::types::Identity;
use sotto_store::Database;

use crate::auth::Authenticator;
use crate::error::RelayError;
use crate::presence::PresenceDirectory;
use crate::relay::MessageRelay;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<MessageRelay>,
    pub presence: PresenceDirectory,
    pub db: Arc<Mutex<Database>>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/users/:identity/public-key", get(get_public_key))
        .route("/users/:identity/public-key", post(set_public_key))
        .route("/messages", get(list_messages))
        .route("/messages", post(send_message))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API (and WebSocket transport) until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Resolve the bearer token in `Authorization` to a verified identity.
fn bearer_identity(headers: &HeaderMap, auth: &dyn Authenticator) -> Result<Identity, RelayError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(RelayError::Unauthorized)?;
    auth.verify(token).ok_or(RelayError::Unauthorized)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetPublicKeyRequest {
    public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageDto {
    id: i64,
    sender: String,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    timestamp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    to: Identity,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    #[serde(default)]
    expiry_timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SendMessageResponse {
    delivered: bool,
    stored: bool,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_public_key(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<PublicKeyResponse>, RelayError> {
    let identity = Identity::new(identity);
    let record = {
        let db = state
            .db
            .lock()
            .map_err(|_| RelayError::Internal("database lock poisoned".to_string()))?;
        db.get_public_key(&identity)
            .map_err(|e| RelayError::Internal(e.to_string()))?
    };

    match record {
        Some(record) => Ok(Json(PublicKeyResponse {
            public_key: hex::encode(record.public_key),
        })),
        None => Err(RelayError::KeyNotFound(identity)),
    }
}

async fn set_public_key(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SetPublicKeyRequest>,
) -> Result<Json<serde_json::Value>, RelayError> {
    let identity = Identity::new(identity);
    let verified = bearer_identity(&headers, state.auth.as_ref())?;
    if verified != identity {
        return Err(RelayError::Forbidden(
            "cannot publish a key for another identity".to_string(),
        ));
    }

    let key_bytes = hex::decode(&request.public_key)
        .map_err(|e| RelayError::BadRequest(format!("invalid public key hex: {e}")))?;
    if key_bytes.len() != 32 {
        return Err(RelayError::BadRequest(
            "public key must be 32 bytes (64 hex chars)".to_string(),
        ));
    }
    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&key_bytes);

    {
        let db = state
            .db
            .lock()
            .map_err(|_| RelayError::Internal("database lock poisoned".to_string()))?;
        db.set_public_key(&identity, &public_key)
            .map_err(|e| RelayError::Internal(e.to_string()))?;
    }

    info!(identity = %identity, "public key published");
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageDto>>, RelayError> {
    let recipient = bearer_identity(&headers, state.auth.as_ref())?;

    let messages = state.relay.list_for_recipient(&recipient)?;
    let dtos = messages
        .into_iter()
        .map(|m| MessageDto {
            id: m.id,
            sender: m.sender.0,
            ciphertext: m.ciphertext,
            nonce: m.nonce,
            timestamp: m.timestamp.to_rfc3339(),
        })
        .collect();

    Ok(Json(dtos))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, RelayError> {
    let sender = bearer_identity(&headers, state.auth.as_ref())?;

    let outcome = state
        .relay
        .send(
            &sender,
            &request.to,
            request.ciphertext,
            request.nonce,
            request.expiry_timestamp,
        )
        .await?;

    Ok(Json(SendMessageResponse {
        delivered: outcome.delivered(),
        stored: outcome.stored(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::auth::StaticTokenAuthenticator;

    #[test]
    fn test_bearer_identity() {
        let auth = StaticTokenAuthenticator::from_spec("s3cret=alice@example.org");

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer s3cret".parse().unwrap());
        assert_eq!(
            bearer_identity(&headers, &auth).unwrap(),
            Identity::from("alice@example.org")
        );

        let mut bad = HeaderMap::new();
        bad.insert("authorization", "Bearer wrong".parse().unwrap());
        assert!(matches!(
            bearer_identity(&bad, &auth),
            Err(RelayError::Unauthorized)
        ));

        assert!(matches!(
            bearer_identity(&HeaderMap::new(), &auth),
            Err(RelayError::Unauthorized)
        ));
    }
}
