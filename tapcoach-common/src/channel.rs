//! Pad channel identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the two transducer channels on the practice kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Kick,
    Snare,
}

impl Channel {
    /// Wire name, also used as the raw tap event text
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Kick => "kick",
            Channel::Snare => "snare",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kick" => Ok(Channel::Kick),
            "snare" => Ok(Channel::Snare),
            other => Err(Error::InvalidInput(format!("unknown channel '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_round_trips_through_wire_name() {
        for channel in [Channel::Kick, Channel::Snare] {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_channel_names_are_case_sensitive() {
        assert!("Kick".parse::<Channel>().is_err());
        assert!("hihat".parse::<Channel>().is_err());
    }
}
