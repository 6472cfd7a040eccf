//! HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tapcoach_common::ControlMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::hardware::VirtualPads;
use crate::notifier::EventBroadcaster;
use crate::state::SharedState;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    /// Last published session snapshot
    pub state: Arc<SharedState>,
    /// Outbound event fan-out
    pub events: EventBroadcaster,
    /// Single-consumer queue into the control loop
    pub inbound: mpsc::UnboundedSender<ControlMessage>,
    /// Software pads struck through `/pads/:channel`
    pub pads: Arc<VirtualPads>,
}

impl AppContext {
    /// Queue a decoded message for the next control pass
    pub fn submit(&self, message: ControlMessage) -> Result<()> {
        self.inbound
            .send(message)
            .map_err(|_| Error::Http("control loop is not running".to_string()))
    }

    /// Decode a raw inbound frame and queue it
    ///
    /// A malformed frame fails with `Error::Common` and queues nothing.
    pub fn submit_frame(&self, payload: &[u8]) -> Result<()> {
        let message = ControlMessage::parse(payload)?;
        self.submit(message)
    }
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/status", get(super::handlers::status))
        .route("/message", post(super::handlers::post_message))
        .route("/pads/:channel", post(super::handlers::strike_pad))
        .route("/ws", get(super::ws::ws_handler))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Companion app may be served from anywhere on the LAN
        .layer(CorsLayer::permissive())
}

/// Serve until `cancel` fires
pub async fn run(addr: SocketAddr, ctx: AppContext, cancel: CancellationToken) -> Result<()> {
    let app = build_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
