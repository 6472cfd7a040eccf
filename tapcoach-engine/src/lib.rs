//! # TapCoach Practice Engine (tapcoach-engine)
//!
//! Real-time drum practice coach: cues beats to a companion app over
//! WebSocket, samples the kick and snare pads, scores strikes against the live
//! cue window, and moves the drummer through the rhythm catalog.
//!
//! **Architecture:** a single cooperative control loop owns the
//! [`session::SessionController`]; network tasks talk to it only through a
//! message queue and hear back through the event broadcaster.

pub mod api;
pub mod catalog;
pub mod control_loop;
pub mod error;
pub mod hardware;
pub mod notifier;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
