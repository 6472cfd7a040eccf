//! Cooperative control loop
//!
//! Every pass, in order:
//! 1. drain and apply all queued inbound messages
//! 2. start an armed session
//! 3. tick the beat scheduler, then sample the pads
//! 4. publish the status snapshot and yield until the next pass
//!
//! WebSocket and HTTP tasks never touch the controller; they push decoded
//! messages into the single-consumer queue this loop drains.

use std::sync::Arc;
use std::time::Duration;
use tapcoach_common::ControlMessage;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::hardware::SensorBus;
use crate::session::SessionController;
use crate::state::SharedState;

/// Monotonic millisecond clock shared by the loop and the virtual pads
#[derive(Debug, Clone, Copy)]
pub struct LoopClock {
    epoch: Instant,
}

impl LoopClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since the clock was created
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for LoopClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ControlLoop {
    controller: SessionController,
    inbound: mpsc::UnboundedReceiver<ControlMessage>,
    sensors: Arc<dyn SensorBus>,
    state: Arc<SharedState>,
    clock: LoopClock,
    pass_interval: Duration,
}

impl ControlLoop {
    pub fn new(
        controller: SessionController,
        inbound: mpsc::UnboundedReceiver<ControlMessage>,
        sensors: Arc<dyn SensorBus>,
        state: Arc<SharedState>,
        clock: LoopClock,
        pass_interval: Duration,
    ) -> Self {
        Self {
            controller,
            inbound,
            sensors,
            state,
            clock,
            pass_interval,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Apply every message queued so far; returns how many were applied
    pub fn drain_inbound(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.inbound.try_recv() {
            debug!("Applying inbound {:?}", message);
            self.controller.handle_message(message);
            applied += 1;
        }
        applied
    }

    /// One full pass at loop-clock time `now_ms`
    pub fn pass(&mut self, now_ms: u64) {
        self.drain_inbound();
        self.controller.run_pass(now_ms, self.sensors.as_ref());
    }

    /// Run passes until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = time::interval(self.pass_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Control loop started ({}ms pass interval)",
            self.pass_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Control loop stopping");
                    break;
                }
                _ = interval.tick() => {}
            }

            let now_ms = self.clock.now_ms();
            self.pass(now_ms);
            self.state.publish(self.controller.snapshot()).await;
        }
    }
}
