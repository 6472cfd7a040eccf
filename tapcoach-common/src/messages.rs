//! Inbound control messages
//!
//! The companion app sends JSON records of the form
//! `{"command"?: "endSession", "bpm"?: int, "rhythm"?: string, "accuracy"?: number}`.
//! A record carrying `command: "endSession"` is a cancellation and ignores any
//! other field. Anything else is a (possibly empty) partial configuration.

use serde::Deserialize;
use tracing::debug;

use crate::Result;

/// Command value that cancels the running session
pub const END_SESSION_COMMAND: &str = "endSession";

/// Partial session configuration; `None` fields keep their previous value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigUpdate {
    /// Beats per minute (validated by the config manager, may be out of range here)
    #[serde(default)]
    pub bpm: Option<i64>,

    /// Rhythm variant name, matched case-sensitively against the catalog
    #[serde(default)]
    pub rhythm: Option<String>,

    /// Target accuracy percentage
    #[serde(default, rename = "accuracy")]
    pub target_accuracy: Option<f64>,
}

impl ConfigUpdate {
    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        self.bpm.is_none() && self.rhythm.is_none() && self.target_accuracy.is_none()
    }
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Cancel the running session
    EndSession,
    /// Merge configuration and arm the next session
    Configure(ConfigUpdate),
}

#[derive(Debug, Deserialize)]
struct InboundRecord {
    #[serde(default)]
    command: Option<String>,
    #[serde(flatten)]
    update: ConfigUpdate,
}

impl ControlMessage {
    /// Decode a raw frame from the transport
    ///
    /// Malformed payloads (not JSON, not an object, wrongly typed fields)
    /// return `Error::Parse`; callers drop them without touching state.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let record: InboundRecord = serde_json::from_slice(payload)?;

        match record.command.as_deref() {
            Some(END_SESSION_COMMAND) => Ok(ControlMessage::EndSession),
            Some(other) => {
                debug!("Ignoring unknown command '{}', treating as configuration", other);
                Ok(ControlMessage::Configure(record.update))
            }
            None => Ok(ControlMessage::Configure(record.update)),
        }
    }
}
