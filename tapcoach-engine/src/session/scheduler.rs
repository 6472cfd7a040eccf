//! Beat cue scheduler
//!
//! Opens a cue window every beat interval and closes it after the fixed cue
//! window duration. Only one window is ever open; the next beat cannot open
//! until the current window has closed, which config validation guarantees
//! happens well before the next beat is due.

use serde::Serialize;
use tapcoach_common::CoachEvent;
use tracing::debug;

use super::TapDetector;
use crate::notifier::Notifier;

/// State of the current beat cue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BeatCue {
    /// 1-based beat number; 0 before the first beat of a session
    pub ordinal: u32,
    pub window_open: bool,
    pub window_start_ms: u64,
}

/// What one scheduler pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    /// Beat whose window opened in this pass
    pub opened: Option<u32>,
    /// A window closed in this pass; `true` if it closed without a tap
    pub closed: Option<bool>,
    /// The final beat was cued; the session is complete
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct BeatScheduler {
    cue: BeatCue,
    total_beats: u32,
    beat_interval_ms: u64,
    cue_window_ms: u64,
    last_beat_ms: u64,
}

impl BeatScheduler {
    pub fn new(cue_window_ms: u64) -> Self {
        Self {
            cue: BeatCue::default(),
            total_beats: 0,
            beat_interval_ms: 0,
            cue_window_ms,
            last_beat_ms: 0,
        }
    }

    /// Arm for a new session; the first beat is due one interval after `now_ms`
    pub fn start(&mut self, now_ms: u64, total_beats: u32, beat_interval_ms: u64) {
        self.cue = BeatCue::default();
        self.total_beats = total_beats;
        self.beat_interval_ms = beat_interval_ms;
        self.last_beat_ms = now_ms;
    }

    /// Close any open window without scoring it
    pub fn stop(&mut self) {
        self.cue.window_open = false;
    }

    pub fn cue(&self) -> &BeatCue {
        &self.cue
    }

    pub fn current_beat(&self) -> u32 {
        self.cue.ordinal
    }

    pub fn window_open(&self) -> bool {
        self.cue.window_open
    }

    /// Advance the cue grid to `now_ms`
    ///
    /// Opening is checked before closing, so a window opened in this pass can
    /// only close on a later pass.
    pub fn tick(&mut self, now_ms: u64, taps: &mut TapDetector, notifier: &dyn Notifier) -> Tick {
        let mut tick = Tick::default();

        if !self.cue.window_open
            && self.cue.ordinal < self.total_beats
            && now_ms.saturating_sub(self.last_beat_ms) >= self.beat_interval_ms
        {
            self.cue.window_open = true;
            self.cue.window_start_ms = now_ms;
            self.cue.ordinal += 1;
            self.last_beat_ms = now_ms;
            taps.open_window();

            notifier.broadcast(CoachEvent::Beat {
                ordinal: self.cue.ordinal,
                total: self.total_beats,
            });
            tick.opened = Some(self.cue.ordinal);

            if self.cue.ordinal == self.total_beats {
                tick.completed = true;
            }
        }

        if self.cue.window_open && now_ms.saturating_sub(self.cue.window_start_ms) >= self.cue_window_ms {
            self.cue.window_open = false;
            let missed = !taps.any_tapped();
            if missed {
                debug!("Beat {} missed", self.cue.ordinal);
                notifier.broadcast(CoachEvent::Miss);
            }
            tick.closed = Some(missed);
        }

        tick
    }
}
