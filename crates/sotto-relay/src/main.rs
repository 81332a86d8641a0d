//! # sotto-relay
//!
//! Relay server for the Sotto end-to-end encrypted messenger.
//!
//! This binary provides:
//! - **WebSocket transport** for real-time delivery of opaque ciphertext
//!   between authenticated connections
//! - **Presence registry** mapping online identities to live connections
//! - **Durable ciphertext storage** (SQLite) for standard-mode messages;
//!   ephemeral messages never touch disk
//! - **Public-key directory** so clients can fetch peers' X25519 keys
//! - **REST API** (axum) for health checks, key publication, and offline
//!   message retrieval

mod api;
mod auth;
mod config;
mod error;
mod presence;
mod relay;
mod storage;
mod ws;

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sotto_store::Database;

use crate::api::AppState;
use crate::auth::StaticTokenAuthenticator;
use crate::config::RelayConfig;
use crate::presence::PresenceDirectory;
use crate::relay::MessageRelay;
use crate::storage::SqliteMessageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sotto_relay=debug")),
        )
        .init();

    info!("Starting Sotto relay server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = RelayConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let database = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let db = Arc::new(Mutex::new(database));

    let auth = StaticTokenAuthenticator::from_spec(&config.auth_tokens);
    if auth.is_empty() {
        warn!("AUTH_TOKENS is empty: no identity will be able to authenticate");
    } else {
        info!(tokens = auth.len(), "static authenticator configured");
    }

    let presence = PresenceDirectory::new();
    let store = Arc::new(SqliteMessageStore::new(db.clone()));
    let relay = Arc::new(MessageRelay::new(presence.clone(), store));

    let app_state = AppState {
        relay,
        presence,
        db,
        auth: Arc::new(auth),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP/WebSocket server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
