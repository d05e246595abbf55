//! Pomodoro widget: countdown mechanics plus a stage that advances on every
//! completion along [`super::stage::ROTATION`].

use super::format::Display;
use super::snapshot::PomodoroSnapshot;
use super::stage::{Rotation, Stage, StageDurations};
use super::{TimerId, WidgetState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PomodoroTick {
    Ignored,
    Running(Display),
    /// The stage ran out; the widget already moved to `to` with a fresh
    /// `next_duration`.
    Completed {
        from: Stage,
        to: Stage,
        next_duration: i64,
    },
}

#[derive(Debug, Clone)]
pub struct PomodoroWidget {
    durations: StageDurations,
    rotation: Rotation,
    /// Remaining seconds in the current stage.
    duration: i64,
    running: bool,
    dirty: bool,
    label: String,
    audio_enabled: bool,
}

impl PomodoroWidget {
    pub fn new(durations: StageDurations, audio_enabled: bool) -> Self {
        let rotation = Rotation::default();
        Self {
            durations,
            rotation,
            duration: durations.for_stage(rotation.stage()),
            running: false,
            dirty: false,
            label: String::new(),
            audio_enabled,
        }
    }

    pub fn hydrate(snapshot: &PomodoroSnapshot, durations: StageDurations) -> Self {
        Self {
            durations,
            rotation: snapshot.rotation(),
            duration: snapshot.duration,
            running: false,
            dirty: snapshot.dirty,
            label: snapshot.label.clone(),
            audio_enabled: snapshot.is_audio_enabled,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stage(&self) -> Stage {
        self.rotation.stage()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn display(&self) -> Display {
        Display::from_secs(self.duration)
    }

    pub fn state(&self) -> WidgetState {
        WidgetState {
            id: TimerId::Pomodoro,
            running: self.running,
            dirty: self.dirty,
            ringing: false,
            duration: Some(self.duration),
            elapsed: None,
            display: self.display(),
            label: self.label.clone(),
            audio_enabled: self.audio_enabled,
            stage: Some(self.stage()),
            splits: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> PomodoroSnapshot {
        PomodoroSnapshot {
            duration: self.duration,
            label: self.label.clone(),
            is_audio_enabled: self.audio_enabled,
            running: self.running,
            saved_at: None,
            stage: self.stage(),
            rotation_index: Some(self.rotation.index()),
            dirty: self.dirty,
        }
    }

    pub fn start(&mut self) -> Option<i64> {
        if self.running {
            return None;
        }
        if self.duration <= 0 {
            self.duration = self.durations.for_stage(self.stage());
        }
        if self.duration <= 0 {
            return None;
        }
        self.running = true;
        self.dirty = true;
        Some(self.duration)
    }

    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Idle at the full length of the current stage.
    pub fn reset(&mut self) {
        self.running = false;
        self.dirty = false;
        self.duration = self.durations.for_stage(self.stage());
    }

    /// Jump to `stage`. Returns the new countdown when running so the live
    /// scheduler can be updated in place.
    pub fn select_stage(&mut self, stage: Stage) -> Option<i64> {
        self.rotation = Rotation::starting_at(stage);
        self.duration = self.durations.for_stage(stage);
        if self.running {
            Some(self.duration)
        } else {
            self.dirty = false;
            None
        }
    }

    /// New stage lengths from configuration. An idle widget picks up the new
    /// length immediately; a dirty one keeps its remaining time.
    pub fn set_durations(&mut self, durations: StageDurations) {
        self.durations = durations;
        if !self.running && !self.dirty {
            self.duration = durations.for_stage(self.stage());
        }
    }

    pub fn on_tick(&mut self, duration: i64) -> PomodoroTick {
        if !self.running {
            return PomodoroTick::Ignored;
        }
        if duration < 0 {
            let from = self.stage();
            self.rotation = self.rotation.next();
            self.duration = self.durations.for_stage(self.stage());
            return PomodoroTick::Completed {
                from,
                to: self.stage(),
                next_duration: self.duration,
            };
        }
        self.duration = duration;
        PomodoroTick::Running(self.display())
    }

    /// Stop at the start of the current stage after a completion when the
    /// next stage is not started automatically.
    pub fn park(&mut self) {
        self.running = false;
        self.dirty = false;
    }

    /// Account for `secs` that passed while nobody was ticking. A stage that
    /// ran out meanwhile is skipped: the widget waits idle at the start of
    /// the next one and this returns false.
    pub fn catch_up(&mut self, secs: i64) -> bool {
        if self.duration > secs {
            self.duration -= secs.max(0);
            return true;
        }
        self.rotation = self.rotation.next();
        self.duration = self.durations.for_stage(self.stage());
        self.running = false;
        self.dirty = false;
        false
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }
}
