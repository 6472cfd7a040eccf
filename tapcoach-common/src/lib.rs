//! # TapCoach Common Library
//!
//! Shared code for the TapCoach practice engine:
//! - Error types
//! - Pad channel identifiers
//! - Outbound event types (CoachEvent) and their wire text
//! - Inbound control message parsing
//! - Bootstrap configuration loading

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;

pub use channel::Channel;
pub use error::{Error, Result};
pub use events::CoachEvent;
pub use messages::{ConfigUpdate, ControlMessage};
