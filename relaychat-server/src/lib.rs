//! Relaychat HTTP server
//!
//! Exposes the relay over HTTP:
//! - `POST /chat`: plain chat, reply streamed as raw UTF-8 text
//! - `POST /chat/retrieval`: same contract with a retrieval step first
//! - `GET /health`: liveness probe

pub mod error;
pub mod logging;
pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use relaychat_core::ChatRelay;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    pub fn new(relay: ChatRelay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}

/// Build the router with all endpoints mounted
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(routes::chat))
        .route("/chat/retrieval", post(routes::chat_with_retrieval))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Serve on an already bound listener until ctrl-c
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Relay listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
