//! Tick schedulers.
//!
//! A [`worker`] runs one timer's clock as an isolated tokio task and talks to
//! the rest of the engine only through channels. A [`SchedulerHandle`] owns
//! the workers of one widget and binds their tick streams to handlers.

mod drift;
mod handle;
mod worker;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timer::TimerId;

pub use drift::{DriftCorrector, Wake};
pub use handle::{SchedulerHandle, SubscriptionToken, TickHandler};

/// Countdown value reported on the wake that exhausts the last second.
pub const COUNTDOWN_DONE: i64 = -1;

/// Countdowns count whole seconds, one per wake.
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

/// One tick from a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickMessage {
    /// Count-up: logical elapsed milliseconds and how late this wake was.
    Elapsed { elapsed: u64, diff: u64 },
    /// Countdown: whole seconds remaining, or [`COUNTDOWN_DONE`].
    Countdown { duration: i64 },
}

/// Which clock a scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    Countdown { duration: i64 },
    CountUp { elapsed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub id: TimerId,
    pub mode: TickMode,
}

impl StartRequest {
    pub fn countdown(id: TimerId, duration: i64) -> Self {
        Self {
            id,
            mode: TickMode::Countdown { duration },
        }
    }

    pub fn count_up(id: TimerId, elapsed: u64) -> Self {
        Self {
            id,
            mode: TickMode::CountUp { elapsed },
        }
    }
}

/// Messages from a handle to its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    UpdateDuration(i64),
    Stop,
}

/// Nominal wake intervals. Only the count-up interval is adjustable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSettings {
    pub count_up_interval: Duration,
}

impl TickSettings {
    pub fn interval_for(&self, mode: TickMode) -> Duration {
        match mode {
            TickMode::Countdown { .. } => COUNTDOWN_INTERVAL,
            TickMode::CountUp { .. } => self.count_up_interval,
        }
    }
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            count_up_interval: Duration::from_millis(10),
        }
    }
}
