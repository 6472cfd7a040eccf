//! HTTP and WebSocket surface for the companion app
//!
//! - `GET /ws`: control messages in, coach events out
//! - `GET /health`, `GET /status`
//! - `POST /message`: control message without a WebSocket
//! - `POST /pads/:channel`: virtual pad strike

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{build_router, run, AppContext};
