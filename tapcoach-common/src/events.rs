//! Event types for the TapCoach broadcast channel
//!
//! Every event renders to the plain delimited text the companion app
//! understands (see `Display`). Events are broadcast in the order the
//! control loop produces them.

use std::fmt;

use crate::Channel;

/// Outbound coach events
#[derive(Debug, Clone, PartialEq)]
pub enum CoachEvent {
    /// Session started with the resolved configuration
    Start {
        rhythm: String,
        bpm: u32,
        beats_per_measure: u32,
        total_beats: u32,
        target_accuracy: f64,
    },

    /// Cue window opened for beat `ordinal` of `total`
    Beat { ordinal: u32, total: u32 },

    /// Raw detection on a pad, scored or not
    Tap(Channel),

    /// Detection landed inside an open cue window
    Hit,

    /// Cue window closed without any detection
    Miss,

    /// Session summary
    End { hits: u32, total: u32, accuracy: f64 },

    /// Target met; the next rhythm variant is now selected
    LevelUp,

    /// Target missed (or no further variant); selection unchanged
    Retry,
}

impl CoachEvent {
    /// Short event name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CoachEvent::Start { .. } => "start",
            CoachEvent::Beat { .. } => "beat",
            CoachEvent::Tap(channel) => channel.as_str(),
            CoachEvent::Hit => "hit",
            CoachEvent::Miss => "miss",
            CoachEvent::End { .. } => "end",
            CoachEvent::LevelUp => "levelUp",
            CoachEvent::Retry => "retry",
        }
    }

    /// Wire text for this event
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CoachEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoachEvent::Start {
                rhythm,
                bpm,
                beats_per_measure,
                total_beats,
                target_accuracy,
            } => write!(
                f,
                "start:{},bpm={},beatsPerMeasure={},totalBeats={},targetAccuracy={:.2}",
                rhythm, bpm, beats_per_measure, total_beats, target_accuracy
            ),
            CoachEvent::Beat { ordinal, total } => write!(f, "beat:{}/{}", ordinal, total),
            CoachEvent::End {
                hits,
                total,
                accuracy,
            } => write!(f, "end:hits={},total={},accuracy={:.2}", hits, total, accuracy),
            other => f.write_str(other.kind()),
        }
    }
}
