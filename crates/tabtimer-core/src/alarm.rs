//! Completion alarm.
//!
//! Playback belongs to the host. The auto-reset that follows an alarm runs on
//! a fixed window (`alarm.window_secs`) and does not wait for playback.

use std::sync::Mutex;

use crate::lock;
use crate::timer::TimerId;

pub trait AlarmPlayer: Send + Sync {
    /// Start playing the completion sound for `id`. Must not block.
    fn play(&self, id: TimerId);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlarm;

impl AlarmPlayer for SilentAlarm {
    fn play(&self, id: TimerId) {
        tracing::debug!(%id, "alarm (silent)");
    }
}

/// Remembers which widgets rang.
#[derive(Debug, Default)]
pub struct RecordingAlarm {
    played: Mutex<Vec<TimerId>>,
}

impl RecordingAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<TimerId> {
        lock(&self.played).clone()
    }
}

impl AlarmPlayer for RecordingAlarm {
    fn play(&self, id: TimerId) {
        lock(&self.played).push(id);
    }
}
