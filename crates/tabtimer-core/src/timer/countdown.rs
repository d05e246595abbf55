//! Countdown timer widget state machine.
//!
//! ```text
//! Idle(dirty=false) -> Running -> Stopped(dirty=true) -> Idle   (reset)
//!                      Running -> Ringing -> Idle                (alarm window)
//! ```
//!
//! Pure state: the widget never talks to schedulers, storage or the page
//! title. [`crate::controller::TimerController`] does that with the values
//! returned here.

use super::format::Display;
use super::input::TimeInput;
use super::snapshot::TimerSnapshot;
use super::{TimerId, WidgetState};
use crate::storage::Preset;

/// Outcome of feeding one countdown tick to a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownTick {
    /// Widget is not running; a late tick from a cancelled scheduler.
    Ignored,
    Running(Display),
    Completed,
}

#[derive(Debug, Clone)]
pub struct TimerWidget {
    input: TimeInput,
    input_valid: bool,
    /// Remaining seconds.
    duration: i64,
    running: bool,
    dirty: bool,
    ringing: bool,
    label: String,
    audio_enabled: bool,
    preset: Option<Preset>,
}

impl TimerWidget {
    pub fn new(audio_enabled: bool) -> Self {
        Self {
            input: TimeInput::default(),
            input_valid: true,
            duration: 0,
            running: false,
            dirty: false,
            ringing: false,
            label: String::new(),
            audio_enabled,
            preset: None,
        }
    }

    /// Rebuild from a persisted record. The widget mounts dirty and stopped;
    /// the controller restarts it when the record was saved while running.
    pub fn hydrate(snapshot: &TimerSnapshot, presets: &[Preset]) -> Self {
        let preset = snapshot
            .preset_id
            .as_deref()
            .and_then(|id| presets.iter().find(|p| p.id == id))
            .cloned();
        Self {
            input: snapshot.input,
            input_valid: true,
            duration: snapshot.duration,
            running: false,
            dirty: true,
            ringing: false,
            label: snapshot.label.clone(),
            audio_enabled: snapshot.is_audio_enabled,
            preset,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn input(&self) -> TimeInput {
        self.input
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn preset(&self) -> Option<&Preset> {
        self.preset.as_ref()
    }

    pub fn display(&self) -> Display {
        Display::from_secs(self.duration)
    }

    pub fn state(&self) -> WidgetState {
        WidgetState {
            id: TimerId::Timer,
            running: self.running,
            dirty: self.dirty,
            ringing: self.ringing,
            duration: Some(self.duration),
            elapsed: None,
            display: self.display(),
            label: self.label.clone(),
            audio_enabled: self.audio_enabled,
            stage: None,
            splits: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            duration: self.duration,
            label: self.label.clone(),
            is_audio_enabled: self.audio_enabled,
            running: self.running,
            saved_at: None,
            input: self.input,
            preset_id: self.preset.as_ref().map(|p| p.id.clone()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the entered time. Only an idle widget accepts input; entering
    /// a time drops any selected preset.
    pub fn set_input(&mut self, input: TimeInput) -> bool {
        if self.running || self.dirty || self.ringing {
            return false;
        }
        self.input = input;
        self.input_valid = true;
        self.preset = None;
        true
    }

    /// Text-field variant of [`Self::set_input`]. Non-numeric text leaves the
    /// widget unable to start until valid input arrives.
    pub fn enter_fields(&mut self, hours: &str, minutes: &str, seconds: &str) -> bool {
        match TimeInput::parse(hours, minutes, seconds) {
            Ok(input) => self.set_input(input),
            Err(e) => {
                tracing::debug!("timer input rejected: {e}");
                if !(self.running || self.dirty || self.ringing) {
                    self.input_valid = false;
                }
                false
            }
        }
    }

    /// Load a preset (or clear the selection). Only while idle.
    pub fn select_preset(&mut self, preset: Option<Preset>) -> bool {
        if self.running || self.dirty || self.ringing {
            return false;
        }
        match preset {
            Some(p) => {
                self.input = p.input();
                self.duration = p.total_secs();
                self.preset = Some(p);
            }
            None => {
                self.preset = None;
                self.input = TimeInput::default();
                self.duration = 0;
            }
        }
        self.input_valid = true;
        true
    }

    /// Returns the countdown to schedule, or `None` when the widget cannot
    /// start (already running, ringing, invalid or all-zero input).
    pub fn start(&mut self) -> Option<i64> {
        if self.running || self.ringing {
            return None;
        }
        if self.dirty && self.duration > 0 {
            self.running = true;
            return Some(self.duration);
        }
        if !self.input_valid {
            return None;
        }
        let input = self.input.normalized();
        let total = input.total_secs();
        if total <= 0 {
            return None;
        }
        self.input = input;
        self.duration = total;
        self.running = true;
        self.dirty = true;
        Some(total)
    }

    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Back to idle. A selected preset is the reset target, otherwise zero.
    pub fn reset(&mut self) {
        self.running = false;
        self.ringing = false;
        self.dirty = false;
        self.input_valid = true;
        match &self.preset {
            Some(p) => {
                self.input = p.input();
                self.duration = p.total_secs();
            }
            None => {
                self.input = TimeInput::default();
                self.duration = 0;
            }
        }
    }

    pub fn on_tick(&mut self, duration: i64) -> CountdownTick {
        if !self.running {
            return CountdownTick::Ignored;
        }
        if duration < 0 {
            self.running = false;
            self.ringing = true;
            self.duration = 0;
            return CountdownTick::Completed;
        }
        self.duration = duration;
        CountdownTick::Running(self.display())
    }

    /// Account for `secs` that passed while nobody was ticking. Returns false
    /// when the countdown ran out meanwhile; the widget is then reset.
    pub fn catch_up(&mut self, secs: i64) -> bool {
        if self.duration > secs {
            self.duration -= secs.max(0);
            true
        } else {
            self.reset();
            false
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }
}
