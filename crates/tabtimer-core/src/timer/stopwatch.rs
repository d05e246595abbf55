use serde::{Deserialize, Serialize};

use super::format::Display;
use super::snapshot::StopwatchSnapshot;
use super::{TimerId, WidgetState};

/// One captured split. Newest splits sit at the front of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    /// Elapsed milliseconds at capture.
    pub elapsed: u64,
    pub elapsed_string: String,
    /// Milliseconds since the previous split (or since zero for the first).
    pub diff: u64,
    pub diff_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopwatchTick {
    Ignored,
    Running {
        display: Display,
        /// The whole-second part changed with this tick.
        second_changed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct StopwatchWidget {
    /// Elapsed milliseconds.
    elapsed: u64,
    running: bool,
    splits: Vec<Split>,
    label: String,
    audio_enabled: bool,
}

impl StopwatchWidget {
    pub fn new() -> Self {
        Self {
            elapsed: 0,
            running: false,
            splits: Vec::new(),
            label: String::new(),
            audio_enabled: false,
        }
    }

    pub fn hydrate(snapshot: &StopwatchSnapshot) -> Self {
        Self {
            elapsed: snapshot.elapsed,
            running: false,
            splits: snapshot.splits.clone(),
            label: snapshot.label.clone(),
            audio_enabled: snapshot.is_audio_enabled,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_dirty(&self) -> bool {
        self.elapsed > 0 || !self.splits.is_empty()
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn display(&self) -> Display {
        Display::from_millis(self.elapsed)
    }

    pub fn state(&self) -> WidgetState {
        WidgetState {
            id: TimerId::Stopwatch,
            running: self.running,
            dirty: self.is_dirty(),
            ringing: false,
            duration: None,
            elapsed: Some(self.elapsed),
            display: self.display(),
            label: self.label.clone(),
            audio_enabled: self.audio_enabled,
            stage: None,
            splits: self.splits.clone(),
        }
    }

    pub fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            elapsed: self.elapsed,
            label: self.label.clone(),
            is_audio_enabled: self.audio_enabled,
            running: self.running,
            saved_at: None,
            splits: self.splits.clone(),
        }
    }

    /// Returns the elapsed time the count-up scheduler resumes from.
    pub fn start(&mut self) -> Option<u64> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(self.elapsed)
    }

    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed = 0;
        self.splits.clear();
    }

    /// Move the clock forward, e.g. by the time a page was closed.
    pub fn advance(&mut self, ms: u64) {
        self.elapsed = self.elapsed.saturating_add(ms);
    }

    pub fn on_tick(&mut self, elapsed: u64) -> StopwatchTick {
        if !self.running {
            return StopwatchTick::Ignored;
        }
        let previous_second = self.elapsed / 1000;
        self.elapsed = elapsed.max(self.elapsed);
        StopwatchTick::Running {
            display: self.display(),
            second_changed: self.elapsed / 1000 != previous_second,
        }
    }

    /// Capture the current elapsed time. Nothing to capture at zero.
    pub fn split(&mut self) -> Option<&Split> {
        if self.elapsed == 0 {
            return None;
        }
        let previous = self.splits.first().map(|s| s.elapsed).unwrap_or(0);
        let diff = self.elapsed.saturating_sub(previous);
        self.splits.insert(
            0,
            Split {
                elapsed: self.elapsed,
                elapsed_string: Display::from_millis(self.elapsed).to_string(),
                diff,
                diff_string: Display::from_millis(diff).to_string(),
            },
        );
        self.splits.first()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }
}

impl Default for StopwatchWidget {
    fn default() -> Self {
        Self::new()
    }
}
