//! HTTP request handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use tapcoach_common::Channel;
use tracing::{info, warn};

use super::server::AppContext;
use crate::error::Error;
use crate::state::SessionSnapshot;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub clients: usize,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "tapcoach-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        clients: ctx.events.client_count(),
    })
}

/// GET /status - last published session snapshot
pub async fn status(State(ctx): State<AppContext>) -> Json<SessionSnapshot> {
    Json(ctx.state.snapshot().await)
}

/// POST /message - same payload as a WebSocket text frame
pub async fn post_message(State(ctx): State<AppContext>, body: Bytes) -> Response {
    match ctx.submit_frame(&body) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))).into_response(),
        Err(Error::Common(e)) => {
            warn!("Dropping malformed message: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

/// POST /pads/:channel - virtual strike
pub async fn strike_pad(State(ctx): State<AppContext>, Path(channel): Path<String>) -> Response {
    match channel.parse::<Channel>() {
        Ok(channel) => {
            info!("Virtual strike on {}", channel);
            ctx.pads.strike(channel);
            (StatusCode::ACCEPTED, Json(json!({ "struck": channel }))).into_response()
        }
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}
