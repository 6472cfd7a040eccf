//! Practice session core
//!
//! - [`ConfigManager`]: validates and merges inbound configuration
//! - [`BeatScheduler`]: opens and closes cue windows on the beat grid
//! - [`TapDetector`]: per-channel threshold, latch and debounce logic
//! - [`SessionController`]: Idle/Ready/Active lifecycle, scoring, progression

pub mod config_manager;
pub mod controller;
pub mod scheduler;
pub mod taps;

pub use config_manager::{beat_interval_ms, ConfigManager, SessionConfig};
pub use controller::{ControllerSnapshot, SessionController, SessionOutcome, SessionState};
pub use scheduler::{BeatCue, BeatScheduler, Tick};
pub use taps::{ChannelLatch, SignalSource, TapDetector};

use serde::Serialize;

/// Hits scored against the beats of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTally {
    pub hit_count: u32,
    pub total_beats: u32,
}

impl ScoreTally {
    pub fn new(total_beats: u32) -> Self {
        Self {
            hit_count: 0,
            total_beats,
        }
    }

    /// Percentage of beats hit; 0 for an empty session
    pub fn accuracy(&self) -> f64 {
        if self.total_beats == 0 {
            return 0.0;
        }
        f64::from(self.hit_count) * 100.0 / f64::from(self.total_beats)
    }
}
