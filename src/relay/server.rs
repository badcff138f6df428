//! Relay HTTP server

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::AppConfig;
use crate::upstream::{GeminiClient, GenerativeBackend};

/// Shared state for the relay.
///
/// Nothing here is mutable: configuration is fixed at startup and the
/// backend is a connection-pooling client. Each request owns its own
/// stream session and response body exclusively.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn GenerativeBackend>,
}

/// Build the relay router over the given state.
///
/// Separate from [`run_server`] so tests can drive the full HTTP surface
/// against a stub backend.
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/summary", post(handlers::summary))
        .route("/api/chat", post(handlers::chat))
        .route("/health", get(health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server until shutdown.
pub async fn run_server(config: AppConfig, api_key: String) -> anyhow::Result<()> {
    let backend = GeminiClient::new(config.upstream.clone(), api_key)?;

    let state = RelayState {
        config: Arc::new(config.clone()),
        backend: Arc::new(backend),
    };

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("gemini-relay listening on {}", addr);
    tracing::info!(
        model = %config.upstream.model,
        upstream = %config.upstream.base_url(),
        "Relaying generation calls"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}
