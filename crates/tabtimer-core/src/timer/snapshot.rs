//! Persisted widget snapshots.
//!
//! One JSON record per widget, keyed by the widget name. Presence of a record
//! means the widget has resumable state and mounts dirty; absence (or a record
//! that fails [`Snapshot::is_valid`]) means default zero state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::input::TimeInput;
use super::stage::{Rotation, Stage};
use super::stopwatch::Split;

fn default_true() -> bool {
    true
}

fn default_stage() -> Stage {
    Stage::Focus
}

/// Shape checks applied after a record has been decoded.
pub trait Snapshot {
    fn is_valid(&self) -> bool;

    /// When the record was written while running, used to account for the
    /// time the page was gone.
    fn resumed_from(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Remaining seconds.
    pub duration: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub is_audio_enabled: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input: TimeInput,
    #[serde(default)]
    pub preset_id: Option<String>,
}

impl Snapshot for TimerSnapshot {
    fn is_valid(&self) -> bool {
        self.duration >= 0
    }

    fn resumed_from(&self) -> Option<DateTime<Utc>> {
        self.saved_at.filter(|_| self.running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSnapshot {
    /// Remaining seconds in the current stage.
    pub duration: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub is_audio_enabled: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default = "default_stage")]
    pub stage: Stage,
    #[serde(default)]
    pub rotation_index: Option<usize>,
    /// Whether the stage time differs from its configured length. Records
    /// written without it are treated as dirty.
    #[serde(default = "default_true")]
    pub dirty: bool,
}

impl PomodoroSnapshot {
    /// Rotation slot, falling back to the first slot of the stored stage.
    pub fn rotation(&self) -> Rotation {
        self.rotation_index
            .and_then(Rotation::at)
            .filter(|r| r.stage() == self.stage)
            .unwrap_or_else(|| Rotation::starting_at(self.stage))
    }
}

impl Snapshot for PomodoroSnapshot {
    fn is_valid(&self) -> bool {
        self.duration >= 0 && self.rotation_index.map_or(true, |i| Rotation::at(i).is_some())
    }

    fn resumed_from(&self) -> Option<DateTime<Utc>> {
        self.saved_at.filter(|_| self.running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopwatchSnapshot {
    /// Elapsed milliseconds.
    pub elapsed: u64,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub is_audio_enabled: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub splits: Vec<Split>,
}

impl Snapshot for StopwatchSnapshot {
    fn is_valid(&self) -> bool {
        // Splits are newest first and can never be ahead of the clock.
        self.splits.iter().all(|s| s.elapsed <= self.elapsed)
            && self.splits.windows(2).all(|w| w[0].elapsed >= w[1].elapsed)
    }

    fn resumed_from(&self) -> Option<DateTime<Utc>> {
        self.saved_at.filter(|_| self.running)
    }
}

/// Milliseconds between `saved_at` and `now`, never negative.
pub fn gap_ms(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - saved_at).num_milliseconds().max(0) as u64
}
