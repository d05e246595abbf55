use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifies one timing widget, and with it the single scheduler that
/// may exist for that widget at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerId {
    Timer,
    Stopwatch,
    Pomodoro,
}

impl TimerId {
    pub const ALL: [TimerId; 3] = [TimerId::Timer, TimerId::Stopwatch, TimerId::Pomodoro];

    /// Storage key and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TimerId::Timer => "timer",
            TimerId::Stopwatch => "stopwatch",
            TimerId::Pomodoro => "pomodoro",
        }
    }

    /// Human-readable name used when a widget has no label.
    pub fn display_name(self) -> &'static str {
        match self {
            TimerId::Timer => "Timer",
            TimerId::Stopwatch => "Stopwatch",
            TimerId::Pomodoro => "Pomodoro",
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimerId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownName {
                kind: "timer id",
                value: s.to_string(),
            })
    }
}
