//! Rhythm catalog
//!
//! Ordered list of meter variants with a selection cursor. The list itself
//! never changes after startup; only the cursor moves, either by name when a
//! configuration picks a rhythm or forward by one on level-up.

use serde::Serialize;
use tapcoach_common::config::RhythmEntry;

use crate::error::{Error, Result};

/// A meter the drummer practises
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RhythmVariant {
    pub name: String,
    pub beats_per_measure: u32,
}

impl RhythmVariant {
    pub fn new(name: &str, beats_per_measure: u32) -> Self {
        Self {
            name: name.to_string(),
            beats_per_measure,
        }
    }
}

impl From<&RhythmEntry> for RhythmVariant {
    fn from(entry: &RhythmEntry) -> Self {
        Self::new(&entry.name, entry.beats_per_measure)
    }
}

#[derive(Debug, Clone)]
pub struct RhythmCatalog {
    variants: Vec<RhythmVariant>,
    selected: usize,
}

impl RhythmCatalog {
    /// Build a catalog with the first variant selected
    pub fn new(variants: Vec<RhythmVariant>) -> Result<Self> {
        if variants.is_empty() {
            return Err(Error::Config("rhythm catalog is empty".to_string()));
        }
        if let Some(bad) = variants.iter().find(|v| v.beats_per_measure == 0) {
            return Err(Error::Config(format!(
                "rhythm '{}' has no beats per measure",
                bad.name
            )));
        }
        Ok(Self {
            variants,
            selected: 0,
        })
    }

    pub fn from_entries(entries: &[RhythmEntry]) -> Result<Self> {
        Self::new(entries.iter().map(RhythmVariant::from).collect())
    }

    /// Currently selected variant
    pub fn current(&self) -> &RhythmVariant {
        &self.variants[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn variants(&self) -> &[RhythmVariant] {
        &self.variants
    }

    pub fn is_last(&self) -> bool {
        self.selected + 1 == self.variants.len()
    }

    /// Select the variant whose name matches exactly (case-sensitive).
    ///
    /// Returns `None` and leaves the selection untouched when no variant matches.
    pub fn select_by_name(&mut self, name: &str) -> Option<&RhythmVariant> {
        let index = self.variants.iter().position(|v| v.name == name)?;
        self.selected = index;
        Some(&self.variants[index])
    }

    /// Move to the next variant if there is one.
    ///
    /// At the last variant the selection stays put and `None` is returned, so
    /// the caller re-offers the same variant.
    pub fn try_advance(&mut self) -> Option<&RhythmVariant> {
        if self.is_last() {
            return None;
        }
        self.selected += 1;
        Some(&self.variants[self.selected])
    }
}
