//! Session controller
//!
//! Owns every piece of mutable session state and is the only thing that
//! changes it. The control loop feeds it decoded inbound messages and calls
//! [`SessionController::run_pass`] once per pass.
//!
//! Lifecycle: `Idle -> Ready -> Active -> Idle`.
//! - accepted configuration arms the next session (`Ready`), never mid-session
//! - the pass after arming starts it (`Active`)
//! - the final beat or an `endSession` command ends it and scores progression

use serde::Serialize;
use std::sync::Arc;
use tapcoach_common::config::TomlConfig;
use tapcoach_common::{CoachEvent, ConfigUpdate, ControlMessage};
use tracing::{debug, info, warn};

use super::config_manager::ApplyReport;
use super::{BeatScheduler, ConfigManager, ScoreTally, SessionConfig, TapDetector};
use crate::catalog::{RhythmCatalog, RhythmVariant};
use crate::error::{Error, Result};
use crate::hardware::{Indicator, SensorBus, StatusIndicator};
use crate::notifier::Notifier;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Waiting for configuration
    Idle,
    /// Configuration accepted; the next pass starts the session
    Ready,
    /// Beats are being cued and taps scored
    Active,
}

/// Result of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub hits: u32,
    pub total: u32,
    pub accuracy: f64,
    pub leveled_up: bool,
    /// Variant selected for the next session
    pub next_rhythm: RhythmVariant,
}

/// Point-in-time view of the controller for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub state: SessionState,
    pub rhythm: String,
    pub rhythm_index: usize,
    pub beats_per_measure: u32,
    pub bpm: u32,
    pub beat_interval_ms: u64,
    pub target_accuracy: f64,
    pub current_beat: u32,
    pub total_beats: u32,
    pub hit_count: u32,
    pub window_open: bool,
}

pub struct SessionController {
    catalog: RhythmCatalog,
    config: ConfigManager,
    state: SessionState,
    tally: ScoreTally,
    scheduler: BeatScheduler,
    taps: TapDetector,
    cycles: u32,
    notifier: Arc<dyn Notifier>,
    indicators: Arc<dyn StatusIndicator>,
}

impl SessionController {
    /// Build an idle controller from the bootstrap configuration
    pub fn from_config(
        settings: &TomlConfig,
        notifier: Arc<dyn Notifier>,
        indicators: Arc<dyn StatusIndicator>,
    ) -> Result<Self> {
        settings.validate()?;

        let mut catalog = RhythmCatalog::from_entries(&settings.rhythms)?;
        catalog.select_by_name(&settings.session.rhythm);

        let config = ConfigManager::new(
            SessionConfig {
                bpm: settings.session.bpm,
                target_accuracy: settings.session.target_accuracy,
            },
            settings.timing.cue_window_ms,
        )
        .map_err(|e| Error::Config(e.to_string()))?;

        let controller = Self {
            catalog,
            config,
            state: SessionState::Idle,
            tally: ScoreTally::default(),
            scheduler: BeatScheduler::new(settings.timing.cue_window_ms),
            taps: TapDetector::new(settings.sensors.kick_threshold, settings.timing.debounce_ms),
            cycles: settings.session.cycles,
            notifier,
            indicators,
        };
        controller.show_state();
        Ok(controller)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn catalog(&self) -> &RhythmCatalog {
        &self.catalog
    }

    pub fn session_config(&self) -> &SessionConfig {
        self.config.config()
    }

    pub fn beat_interval_ms(&self) -> u64 {
        self.config.beat_interval_ms()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let rhythm = self.catalog.current();
        ControllerSnapshot {
            state: self.state,
            rhythm: rhythm.name.clone(),
            rhythm_index: self.catalog.selected_index(),
            beats_per_measure: rhythm.beats_per_measure,
            bpm: self.config.config().bpm,
            beat_interval_ms: self.config.beat_interval_ms(),
            target_accuracy: self.config.config().target_accuracy,
            current_beat: self.scheduler.current_beat(),
            total_beats: self.tally.total_beats,
            hit_count: self.tally.hit_count,
            window_open: self.scheduler.window_open(),
        }
    }

    /// Apply one decoded inbound message
    pub fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::EndSession => self.end_session(),
            ControlMessage::Configure(update) => {
                if let Err(e) = self.apply_config(&update) {
                    warn!("Configuration rejected: {}", e);
                }
            }
        }
    }

    /// Merge a configuration update and arm the next session
    ///
    /// Rejected while a session is running; the in-progress tally is never
    /// disturbed. A rejected update changes nothing.
    pub fn apply_config(&mut self, update: &ConfigUpdate) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(Error::InvalidState(
                "configuration cannot change while a session is running".to_string(),
            ));
        }

        let report = self.config.apply(update, &mut self.catalog)?;
        self.log_applied(update, &report);
        self.state = SessionState::Ready;
        self.show_state();
        info!("Ready to start {} session", self.catalog.current().name);
        Ok(())
    }

    fn log_applied(&self, update: &ConfigUpdate, report: &ApplyReport) {
        let config = self.config.config();
        if update.is_empty() {
            info!("Empty update, keeping current configuration");
        }
        if report.bpm_changed {
            info!(
                "Tempo now {} bpm ({}ms per beat)",
                config.bpm,
                self.config.beat_interval_ms()
            );
        }
        if report.accuracy_changed {
            info!("Target accuracy now {:.2}%", config.target_accuracy);
        }
        match (report.rhythm_matched, update.rhythm.as_deref()) {
            (Some(false), Some(name)) => warn!(
                "Unknown rhythm '{}', keeping '{}'",
                name,
                self.catalog.current().name
            ),
            (Some(true), _) => info!("Rhythm selected: {}", self.catalog.current().name),
            _ => {}
        }
    }

    /// `endSession` command: always accepted
    ///
    /// Ends a running session with its summary, withdraws an armed one, and
    /// is a no-op while idle.
    pub fn end_session(&mut self) {
        match self.state {
            SessionState::Active => {
                info!("Session cancelled by client");
                self.end();
            }
            SessionState::Ready => {
                info!("Pending session withdrawn by client");
                self.state = SessionState::Idle;
                self.show_state();
            }
            SessionState::Idle => debug!("endSession while idle, nothing to end"),
        }
    }

    /// One control pass after inbound messages were drained
    pub fn run_pass(&mut self, now_ms: u64, sensors: &dyn SensorBus) {
        if self.state == SessionState::Ready {
            self.start_session(now_ms);
        }

        if self.state != SessionState::Active {
            return;
        }

        let tick = self.scheduler.tick(now_ms, &mut self.taps, self.notifier.as_ref());
        if tick.opened.is_some() {
            self.indicators.set(Indicator::Beat, true);
        }
        if tick.closed.is_some() {
            self.indicators.set(Indicator::Beat, false);
        }

        self.taps.sample(
            now_ms,
            self.scheduler.window_open(),
            sensors,
            &mut self.tally,
            self.notifier.as_ref(),
        );

        if tick.completed {
            self.end();
        }
    }

    /// Reset scoring state and announce the session
    pub fn start_session(&mut self, now_ms: u64) {
        let rhythm = self.catalog.current().clone();
        let total_beats = rhythm.beats_per_measure * self.cycles;
        let beat_interval_ms = self.config.refresh_beat_interval();

        self.tally = ScoreTally::new(total_beats);
        self.taps.reset();
        self.scheduler.start(now_ms, total_beats, beat_interval_ms);
        self.state = SessionState::Active;

        let config = self.config.config();
        info!(
            "Starting {} session: {} beats at {} bpm, target {:.2}%",
            rhythm.name, total_beats, config.bpm, config.target_accuracy
        );
        self.notifier.broadcast(CoachEvent::Start {
            rhythm: rhythm.name,
            bpm: config.bpm,
            beats_per_measure: rhythm.beats_per_measure,
            total_beats,
            target_accuracy: config.target_accuracy,
        });
    }

    /// Finish the running session: summary, progression, back to Idle
    ///
    /// Returns `None` when no session is running.
    pub fn end(&mut self) -> Option<SessionOutcome> {
        if self.state != SessionState::Active {
            return None;
        }

        self.scheduler.stop();
        self.indicators.set(Indicator::Beat, false);

        let accuracy = self.tally.accuracy();
        self.notifier.broadcast(CoachEvent::End {
            hits: self.tally.hit_count,
            total: self.tally.total_beats,
            accuracy,
        });
        info!(
            "Session ended: {}/{} hits, accuracy {:.2}%",
            self.tally.hit_count, self.tally.total_beats, accuracy
        );

        let target = self.config.config().target_accuracy;
        let leveled_up = accuracy >= target && self.catalog.try_advance().is_some();
        if leveled_up {
            info!("Level up! Next rhythm: {}", self.catalog.current().name);
            self.notifier.broadcast(CoachEvent::LevelUp);
        } else {
            info!("Retry {}", self.catalog.current().name);
            self.notifier.broadcast(CoachEvent::Retry);
        }

        self.state = SessionState::Idle;
        self.show_state();

        Some(SessionOutcome {
            hits: self.tally.hit_count,
            total: self.tally.total_beats,
            accuracy,
            leveled_up,
            next_rhythm: self.catalog.current().clone(),
        })
    }

    fn show_state(&self) {
        let idle = self.state == SessionState::Idle;
        self.indicators.set(Indicator::Standby, idle);
        self.indicators.set(Indicator::Ready, !idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::LogIndicators;
    use std::sync::Mutex;
    use tapcoach_common::Channel;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Notifier for Recorder {
        fn broadcast(&self, event: CoachEvent) {
            self.0.lock().unwrap().push(event.to_wire());
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    struct Silent;

    impl SensorBus for Silent {
        fn read_analog(&self, _channel: Channel) -> i32 {
            0
        }
        fn read_digital(&self, _channel: Channel) -> bool {
            false
        }
    }

    fn controller() -> (SessionController, Arc<Recorder>, Arc<LogIndicators>) {
        let notifier = Arc::new(Recorder::default());
        let lamps = Arc::new(LogIndicators::new());
        let controller =
            SessionController::from_config(&TomlConfig::default(), notifier.clone(), lamps.clone())
                .unwrap();
        (controller, notifier, lamps)
    }

    fn configure(controller: &mut SessionController, json: &str) -> Result<()> {
        match ControlMessage::parse(json.as_bytes()).unwrap() {
            ControlMessage::Configure(update) => controller.apply_config(&update),
            ControlMessage::EndSession => panic!("expected configuration"),
        }
    }

    #[test]
    fn test_starts_idle_with_standby_lamp() {
        let (controller, _, lamps) = controller();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(lamps.is_on(Indicator::Standby));
        assert!(!lamps.is_on(Indicator::Ready));
    }

    #[test]
    fn test_rejects_bootstrap_config_that_overflows_beat_count() {
        let mut settings = TomlConfig::default();
        settings.session.cycles = u32::MAX;
        let result = SessionController::from_config(
            &settings,
            Arc::new(Recorder::default()),
            Arc::new(LogIndicators::new()),
        );
        assert!(matches!(
            result,
            Err(Error::Common(tapcoach_common::Error::Config(_)))
        ));
    }

    #[test]
    fn test_starts_on_configured_default_rhythm() {
        let mut settings = TomlConfig::default();
        settings.session.rhythm = "3/4".to_string();
        let controller = SessionController::from_config(
            &settings,
            Arc::new(Recorder::default()),
            Arc::new(LogIndicators::new()),
        )
        .unwrap();
        assert_eq!(controller.catalog().current().name, "3/4");
    }

    #[test]
    fn test_config_arms_and_next_pass_starts() {
        let (mut controller, notifier, lamps) = controller();
        configure(&mut controller, r#"{"bpm":120,"rhythm":"4/4","accuracy":85}"#).unwrap();
        assert_eq!(controller.state(), SessionState::Ready);
        assert!(lamps.is_on(Indicator::Ready));
        assert!(!lamps.is_on(Indicator::Standby));

        controller.run_pass(0, &Silent);
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.tally(), ScoreTally::new(20));
        assert_eq!(controller.beat_interval_ms(), 500);
        assert_eq!(
            notifier.take(),
            vec!["start:4/4,bpm=120,beatsPerMeasure=4,totalBeats=20,targetAccuracy=85.00"]
        );
    }

    #[test]
    fn test_total_beats_follow_selected_rhythm() {
        let (mut controller, _, _) = controller();
        for (name, beats) in [("4/4", 4), ("3/4", 3), ("7/4", 7)] {
            configure(&mut controller, &format!(r#"{{"rhythm":"{}"}}"#, name)).unwrap();
            controller.run_pass(0, &Silent);
            assert_eq!(controller.tally().total_beats, beats * 5);
            controller.end_session();
        }
    }

    #[test]
    fn test_reconfiguration_rejected_mid_session() {
        let (mut controller, _, _) = controller();
        configure(&mut controller, r#"{"bpm":100}"#).unwrap();
        controller.run_pass(0, &Silent);

        let err = configure(&mut controller, r#"{"bpm":60,"rhythm":"3/4"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.session_config().bpm, 100);
        assert_eq!(controller.catalog().current().name, "4/4");
    }

    #[test]
    fn test_invalid_config_leaves_state_idle() {
        let (mut controller, notifier, _) = controller();
        assert!(configure(&mut controller, r#"{"bpm":0}"#).is_err());
        assert_eq!(controller.state(), SessionState::Idle);
        controller.run_pass(0, &Silent);
        assert!(notifier.take().is_empty());
    }

    #[test]
    fn test_end_session_withdraws_armed_session() {
        let (mut controller, notifier, lamps) = controller();
        configure(&mut controller, "{}").unwrap();
        controller.handle_message(ControlMessage::EndSession);
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(lamps.is_on(Indicator::Standby));

        controller.run_pass(0, &Silent);
        assert!(notifier.take().is_empty());
    }

    #[test]
    fn test_end_session_while_idle_is_noop() {
        let (mut controller, notifier, _) = controller();
        controller.handle_message(ControlMessage::EndSession);
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(notifier.take().is_empty());
        assert!(controller.end().is_none());
    }

    #[test]
    fn test_zero_target_levels_up_even_with_no_hits() {
        let (mut controller, notifier, _) = controller();
        configure(&mut controller, r#"{"accuracy":0}"#).unwrap();
        controller.run_pass(0, &Silent);
        notifier.take();

        let outcome = controller.end().unwrap();
        assert!(outcome.leveled_up);
        assert_eq!(outcome.next_rhythm.name, "3/4");
        assert_eq!(notifier.take(), vec!["end:hits=0,total=20,accuracy=0.00", "levelUp"]);
    }

    #[test]
    fn test_empty_tally_reports_zero_accuracy() {
        let (mut controller, notifier, _) = controller();
        configure(&mut controller, "{}").unwrap();
        controller.run_pass(0, &Silent);
        controller.tally = ScoreTally::default();
        notifier.take();

        let outcome = controller.end().unwrap();
        assert_eq!(outcome.accuracy, 0.0);
        assert_eq!(notifier.take(), vec!["end:hits=0,total=0,accuracy=0.00", "retry"]);
    }

    #[test]
    fn test_end_turns_beat_lamp_off() {
        let (mut controller, _, lamps) = controller();
        configure(&mut controller, "{}").unwrap();
        controller.run_pass(0, &Silent);
        controller.run_pass(500, &Silent);
        assert!(lamps.is_on(Indicator::Beat));

        controller.end_session();
        assert!(!lamps.is_on(Indicator::Beat));
        assert!(!lamps.is_on(Indicator::Ready));
        assert!(lamps.is_on(Indicator::Standby));
    }
}
