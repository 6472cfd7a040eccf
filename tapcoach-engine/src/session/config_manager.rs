//! Session configuration intake
//!
//! Inbound updates are partial: every present field overwrites the active
//! value, absent fields are kept. An update is validated as a whole before
//! anything is written, so a bad bpm never leaves a half-applied accuracy
//! behind. An unknown rhythm name is the one non-fatal problem: the other
//! fields still apply and the selection stays where it was. The returned
//! [`ApplyReport`] says which of these happened.

use serde::Serialize;
use tapcoach_common::ConfigUpdate;
use tracing::debug;

use crate::catalog::RhythmCatalog;
use crate::error::{Error, Result};

/// Milliseconds between beats at `bpm` (truncating)
pub fn beat_interval_ms(bpm: u32) -> u64 {
    60_000 / u64::from(bpm.max(1))
}

/// Active tempo and scoring target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub bpm: u32,
    pub target_accuracy: f64,
}

/// What an accepted update changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub bpm_changed: bool,
    pub accuracy_changed: bool,
    /// `Some(false)` when a rhythm name was given but is not in the catalog
    pub rhythm_matched: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SessionConfig,
    cue_window_ms: u64,
    beat_interval_ms: u64,
}

impl ConfigManager {
    /// Wrap the startup configuration, rejecting a tempo that would overlap windows
    pub fn new(config: SessionConfig, cue_window_ms: u64) -> Result<Self> {
        let manager = Self {
            beat_interval_ms: beat_interval_ms(config.bpm),
            config,
            cue_window_ms,
        };
        manager.check_bpm(i64::from(manager.config.bpm))?;
        manager.check_accuracy(manager.config.target_accuracy)?;
        Ok(manager)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn beat_interval_ms(&self) -> u64 {
        self.beat_interval_ms
    }

    /// Recompute the beat interval from the active bpm
    pub fn refresh_beat_interval(&mut self) -> u64 {
        self.beat_interval_ms = beat_interval_ms(self.config.bpm);
        self.beat_interval_ms
    }

    fn check_bpm(&self, bpm: i64) -> Result<u32> {
        if bpm <= 0 {
            return Err(Error::InvalidConfig(format!("bpm must be positive, got {}", bpm)));
        }
        let bpm = u32::try_from(bpm)
            .map_err(|_| Error::InvalidConfig(format!("bpm {} is out of range", bpm)))?;
        let interval = beat_interval_ms(bpm);
        if interval <= self.cue_window_ms {
            return Err(Error::InvalidConfig(format!(
                "bpm {} gives a {}ms beat interval, which must exceed the {}ms cue window",
                bpm, interval, self.cue_window_ms
            )));
        }
        Ok(bpm)
    }

    fn check_accuracy(&self, accuracy: f64) -> Result<f64> {
        if !(0.0..=100.0).contains(&accuracy) {
            return Err(Error::InvalidConfig(format!(
                "target accuracy {} is outside 0-100",
                accuracy
            )));
        }
        Ok(accuracy)
    }

    /// Validate `update` in full, then merge it into the active configuration
    ///
    /// On error nothing is changed, including the catalog selection.
    pub fn apply(&mut self, update: &ConfigUpdate, catalog: &mut RhythmCatalog) -> Result<ApplyReport> {
        let bpm = update.bpm.map(|bpm| self.check_bpm(bpm)).transpose()?;
        let accuracy = update
            .target_accuracy
            .map(|accuracy| self.check_accuracy(accuracy))
            .transpose()?;

        let mut report = ApplyReport::default();

        if let Some(bpm) = bpm {
            report.bpm_changed = bpm != self.config.bpm;
            self.config.bpm = bpm;
        }
        if let Some(accuracy) = accuracy {
            report.accuracy_changed = accuracy != self.config.target_accuracy;
            self.config.target_accuracy = accuracy;
        }
        if let Some(name) = update.rhythm.as_deref() {
            report.rhythm_matched = Some(catalog.select_by_name(name).is_some());
        }

        self.refresh_beat_interval();

        debug!(
            "Config applied: bpm={} ({}ms/beat), rhythm={} ({} beats/measure), target={:.2}%",
            self.config.bpm,
            self.beat_interval_ms,
            catalog.current().name,
            catalog.current().beats_per_measure,
            self.config.target_accuracy
        );

        Ok(report)
    }
}
