//! Tap detection
//!
//! Both pads are read on every pass. A reading counts as a detection only if
//! it crosses the pad's threshold, the pad's latch is open, and at least
//! `debounce_ms` has passed since the pad's last accepted detection. The
//! debounce is a timestamp comparison; nothing here ever sleeps.
//!
//! A latched pad ignores further crossings until the scheduler opens the next
//! cue window, so sustained contact or contact bounce scores at most once.

use serde::Serialize;
use tapcoach_common::{Channel, CoachEvent};
use tracing::debug;

use super::ScoreTally;
use crate::hardware::SensorBus;
use crate::notifier::Notifier;

/// How a pad reports a strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Analog transducer; strike when the reading exceeds `threshold`
    Analog { threshold: i32 },
    /// Comparator output; strike while the line is high
    Digital,
}

/// Per-pad scoring latch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelLatch {
    pub tapped: bool,
    /// Loop-clock time of the last accepted detection
    pub last_accepted_ms: Option<u64>,
}

#[derive(Debug, Clone)]
struct Pad {
    channel: Channel,
    source: SignalSource,
    latch: ChannelLatch,
}

impl Pad {
    fn crossed(&self, sensors: &dyn SensorBus) -> bool {
        match self.source {
            SignalSource::Analog { threshold } => sensors.read_analog(self.channel) > threshold,
            SignalSource::Digital => sensors.read_digital(self.channel),
        }
    }

    fn debounced(&self, now_ms: u64, debounce_ms: u64) -> bool {
        match self.latch.last_accepted_ms {
            Some(last) => now_ms.saturating_sub(last) >= debounce_ms,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TapDetector {
    pads: [Pad; 2],
    debounce_ms: u64,
}

impl TapDetector {
    /// Kick on an analog input with `kick_threshold`, snare on a digital input
    pub fn new(kick_threshold: i32, debounce_ms: u64) -> Self {
        Self::with_sources(
            SignalSource::Analog {
                threshold: kick_threshold,
            },
            SignalSource::Digital,
            debounce_ms,
        )
    }

    pub fn with_sources(kick: SignalSource, snare: SignalSource, debounce_ms: u64) -> Self {
        Self {
            pads: [
                Pad {
                    channel: Channel::Kick,
                    source: kick,
                    latch: ChannelLatch::default(),
                },
                Pad {
                    channel: Channel::Snare,
                    source: snare,
                    latch: ChannelLatch::default(),
                },
            ],
            debounce_ms,
        }
    }

    pub fn latch(&self, channel: Channel) -> &ChannelLatch {
        &self.pad(channel).latch
    }

    fn pad(&self, channel: Channel) -> &Pad {
        match channel {
            Channel::Kick => &self.pads[0],
            Channel::Snare => &self.pads[1],
        }
    }

    /// Fresh latches for a new session
    pub fn reset(&mut self) {
        for pad in &mut self.pads {
            pad.latch = ChannelLatch::default();
        }
    }

    /// Re-arm both latches; called when a cue window opens
    pub fn open_window(&mut self) {
        for pad in &mut self.pads {
            pad.latch.tapped = false;
        }
    }

    /// Whether either pad has latched since the last window opened
    pub fn any_tapped(&self) -> bool {
        self.pads.iter().any(|pad| pad.latch.tapped)
    }

    /// Read both pads once and score accepted detections
    ///
    /// Every detection broadcasts the raw pad event. It scores a hit only while
    /// a window is open; otherwise it is dropped for scoring. Returns the
    /// number of hits scored in this pass.
    pub fn sample(
        &mut self,
        now_ms: u64,
        window_open: bool,
        sensors: &dyn SensorBus,
        tally: &mut ScoreTally,
        notifier: &dyn Notifier,
    ) -> u32 {
        let debounce_ms = self.debounce_ms;
        let mut hits = 0;

        for pad in &mut self.pads {
            if pad.latch.tapped || !pad.crossed(sensors) || !pad.debounced(now_ms, debounce_ms) {
                continue;
            }

            pad.latch.tapped = true;
            pad.latch.last_accepted_ms = Some(now_ms);
            notifier.broadcast(CoachEvent::Tap(pad.channel));

            if window_open {
                tally.hit_count += 1;
                hits += 1;
                notifier.broadcast(CoachEvent::Hit);
                debug!("{} hit at {}ms ({} total)", pad.channel, now_ms, tally.hit_count);
            } else {
                debug!("{} outside cue window at {}ms", pad.channel, now_ms);
            }
        }

        hits
    }
}
