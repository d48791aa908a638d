//! Periodic reconnect loop.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scenedeck_core::ControlError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What the loop reconnects.
#[async_trait]
pub trait ReconnectTarget: Send + Sync {
    /// Whether an identified session already exists.
    fn is_identified(&self) -> bool;

    /// One connect attempt.
    async fn attempt(&self) -> Result<(), ControlError>;
}

/// Single periodic retry timer.
///
/// At most one loop runs at a time. Each tick stops the loop if the target is
/// already identified, otherwise attempts a connect; a successful attempt
/// stops the loop too. There is no retry limit.
#[derive(Debug)]
pub struct ReconnectScheduler {
    period: Duration,
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectScheduler {
    /// Scheduler ticking every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            slot: Mutex::new(None),
        }
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the loop unless one is already running. The first attempt
    /// happens one period from now. Returns whether a loop was started.
    pub fn start(&self, target: Weak<dyn ReconnectTarget>) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        info!(period_ms = self.period.as_millis(), "starting reconnect loop");
        *slot = Some(tokio::spawn(run(target, self.period)));
        true
    }

    /// Cancel the running loop, if any.
    pub fn stop(&self) {
        if let Some(handle) = self.slot.lock().take() {
            if !handle.is_finished() {
                debug!("stopping reconnect loop");
            }
            handle.abort();
        }
    }

    /// Whether a loop is active.
    pub fn is_running(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ReconnectScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.slot.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run(target: Weak<dyn ReconnectTarget>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempt: u64 = 0;

    loop {
        let _ = ticker.tick().await;
        let Some(target) = target.upgrade() else {
            break;
        };
        if target.is_identified() {
            debug!("already identified, reconnect loop done");
            break;
        }
        attempt += 1;
        match target.attempt().await {
            Ok(()) => {
                info!(attempt, "reconnected to OBS");
                break;
            }
            Err(e) => {
                warn!(attempt, error = %e, kind = e.error_kind(), "reconnect attempt failed");
            }
        }
    }
}
