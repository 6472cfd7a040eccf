//! Bootstrap configuration loading and config file resolution
//!
//! The TOML file is optional. When it is missing every value falls back to
//! the compiled defaults below; when it exists but cannot be read or fails
//! validation, startup aborts.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAPCOACH_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Interface to bind the HTTP/WebSocket server to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP/WebSocket server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub sensors: SensorConfig,

    /// Ordered rhythm catalog
    #[serde(default = "default_rhythms")]
    pub rhythms: Vec<RhythmEntry>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Session values in effect before the first inbound configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_bpm")]
    pub bpm: u32,

    #[serde(default = "default_target_accuracy")]
    pub target_accuracy: f64,

    /// Name of the initially selected rhythm
    #[serde(default = "default_rhythm")]
    pub rhythm: String,

    /// Measures played per session
    #[serde(default = "default_cycles")]
    pub cycles: u32,
}

/// Timing constants for the control loop
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// How long a beat cue stays live
    #[serde(default = "default_cue_window_ms")]
    pub cue_window_ms: u64,

    /// Minimum spacing between accepted detections on one channel
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Yield between control loop passes
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
}

/// Pad sensor tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Analog reading the kick pad must exceed to count as a strike
    #[serde(default = "default_kick_threshold")]
    pub kick_threshold: i32,

    /// How long a virtual pad strike holds the reading high
    #[serde(default = "default_pulse_ms")]
    pub virtual_pulse_ms: u64,
}

/// One rhythm catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RhythmEntry {
    pub name: String,
    pub beats_per_measure: u32,
}

impl RhythmEntry {
    pub fn new(name: &str, beats_per_measure: u32) -> Self {
        Self {
            name: name.to_string(),
            beats_per_measure,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8181
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bpm() -> u32 {
    120
}

fn default_target_accuracy() -> f64 {
    85.0
}

fn default_rhythm() -> String {
    "4/4".to_string()
}

fn default_cycles() -> u32 {
    5
}

fn default_cue_window_ms() -> u64 {
    200
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_loop_interval_ms() -> u64 {
    10
}

fn default_kick_threshold() -> i32 {
    100
}

fn default_pulse_ms() -> u64 {
    30
}

fn default_rhythms() -> Vec<RhythmEntry> {
    vec![
        RhythmEntry::new("4/4", 4),
        RhythmEntry::new("3/4", 3),
        RhythmEntry::new("7/4", 7),
    ]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            target_accuracy: default_target_accuracy(),
            rhythm: default_rhythm(),
            cycles: default_cycles(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cue_window_ms: default_cue_window_ms(),
            debounce_ms: default_debounce_ms(),
            loop_interval_ms: default_loop_interval_ms(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kick_threshold: default_kick_threshold(),
            virtual_pulse_ms: default_pulse_ms(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            session: SessionDefaults::default(),
            timing: TimingConfig::default(),
            sensors: SensorConfig::default(),
            rhythms: default_rhythms(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the resolved config path, or compiled defaults when none exists
    ///
    /// Returns the config together with the file it came from (`None` for
    /// compiled defaults) so the caller can log it once tracing is up.
    pub fn load_resolved(cli_arg: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Reject settings the session engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rhythms.is_empty() {
            return Err(Error::Config("rhythm catalog must not be empty".to_string()));
        }
        for (i, entry) in self.rhythms.iter().enumerate() {
            if entry.beats_per_measure == 0 {
                return Err(Error::Config(format!(
                    "rhythm '{}' must have at least one beat per measure",
                    entry.name
                )));
            }
            if self.rhythms[..i].iter().any(|e| e.name == entry.name) {
                return Err(Error::Config(format!("duplicate rhythm name '{}'", entry.name)));
            }
        }
        if !self.rhythms.iter().any(|e| e.name == self.session.rhythm) {
            return Err(Error::Config(format!(
                "default rhythm '{}' is not in the catalog",
                self.session.rhythm
            )));
        }
        if self.session.cycles == 0 {
            return Err(Error::Config("session cycles must be positive".to_string()));
        }
        for entry in &self.rhythms {
            if entry.beats_per_measure.checked_mul(self.session.cycles).is_none() {
                return Err(Error::Config(format!(
                    "rhythm '{}' with {} cycles exceeds the beat counter",
                    entry.name, self.session.cycles
                )));
            }
        }
        if self.timing.cue_window_ms == 0 {
            return Err(Error::Config("cue_window_ms must be positive".to_string()));
        }
        if self.timing.loop_interval_ms == 0 {
            return Err(Error::Config("loop_interval_ms must be positive".to_string()));
        }
        if self.session.bpm == 0 {
            return Err(Error::Config("default bpm must be positive".to_string()));
        }
        let interval = 60_000 / u64::from(self.session.bpm);
        if interval <= self.timing.cue_window_ms {
            return Err(Error::Config(format!(
                "default bpm {} gives a {}ms beat interval, which must exceed the {}ms cue window",
                self.session.bpm, interval, self.timing.cue_window_ms
            )));
        }
        let accuracy = self.session.target_accuracy;
        if !(0.0..=100.0).contains(&accuracy) {
            return Err(Error::Config(format!(
                "default target accuracy {} is outside 0-100",
                accuracy
            )));
        }
        Ok(())
    }
}

/// Config file resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `<user config dir>/tapcoach/config.toml`, if it exists
///
/// Returns `None` when no file applies (compiled defaults are used).
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    default_config_file().filter(|path| path.exists())
}

/// Platform config location (`~/.config/tapcoach/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tapcoach").join("config.toml"))
}
