//! Hardware seams: pad sensors and status indicators
//!
//! The session engine reads pads through [`SensorBus`] and drives indicator
//! lamps through [`StatusIndicator`]. Host builds without transducers use
//! [`VirtualPads`] (strikes injected over HTTP) and [`LogIndicators`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tapcoach_common::Channel;
use tracing::debug;

use crate::control_loop::LoopClock;

/// Full-scale analog reading reported while a virtual pad is struck
pub const ANALOG_FULL_SCALE: i32 = 1023;

/// Raw sensor read primitives
pub trait SensorBus: Send + Sync {
    fn read_analog(&self, channel: Channel) -> i32;
    fn read_digital(&self, channel: Channel) -> bool;
}

/// Software pads for hosts without piezo inputs
///
/// A strike holds the channel high (analog full scale, digital true) for
/// `pulse_ms` on the loop clock.
pub struct VirtualPads {
    clock: LoopClock,
    pulse_ms: u64,
    // Exclusive end of the current pulse per channel, in loop-clock ms
    held_until: [AtomicU64; 2],
}

impl VirtualPads {
    pub fn new(clock: LoopClock, pulse_ms: u64) -> Self {
        Self {
            clock,
            pulse_ms,
            held_until: [AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Strike a pad now
    pub fn strike(&self, channel: Channel) {
        self.strike_at(channel, self.clock.now_ms());
    }

    /// Strike a pad at an explicit loop-clock time
    pub fn strike_at(&self, channel: Channel, at_ms: u64) {
        let until = at_ms.saturating_add(self.pulse_ms);
        self.held_until[slot(channel)].store(until, Ordering::Release);
        debug!("Virtual {} strike at {}ms", channel, at_ms);
    }

    fn is_held(&self, channel: Channel) -> bool {
        self.clock.now_ms() < self.held_until[slot(channel)].load(Ordering::Acquire)
    }
}

fn slot(channel: Channel) -> usize {
    match channel {
        Channel::Kick => 0,
        Channel::Snare => 1,
    }
}

impl SensorBus for VirtualPads {
    fn read_analog(&self, channel: Channel) -> i32 {
        if self.is_held(channel) {
            ANALOG_FULL_SCALE
        } else {
            0
        }
    }

    fn read_digital(&self, channel: Channel) -> bool {
        self.is_held(channel)
    }
}

/// Binary status lamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Waiting for configuration (red)
    Standby,
    /// Configuration accepted, session armed or running (green)
    Ready,
    /// A cue window is open
    Beat,
}

impl Indicator {
    fn index(self) -> usize {
        match self {
            Indicator::Standby => 0,
            Indicator::Ready => 1,
            Indicator::Beat => 2,
        }
    }
}

/// Status indicator output sink; write-only from the engine's point of view
pub trait StatusIndicator: Send + Sync {
    fn set(&self, indicator: Indicator, on: bool);
}

/// Indicator sink that logs level changes
#[derive(Default)]
pub struct LogIndicators {
    levels: [AtomicBool; 3],
}

impl LogIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, indicator: Indicator) -> bool {
        self.levels[indicator.index()].load(Ordering::Relaxed)
    }
}

impl StatusIndicator for LogIndicators {
    fn set(&self, indicator: Indicator, on: bool) {
        let previous = self.levels[indicator.index()].swap(on, Ordering::Relaxed);
        if previous != on {
            debug!("Indicator {:?} -> {}", indicator, if on { "on" } else { "off" });
        }
    }
}
