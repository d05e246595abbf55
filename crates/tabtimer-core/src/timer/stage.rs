use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Pomodoro stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Focus,
    Short,
    Long,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Focus => "focus",
            Stage::Short => "short",
            Stage::Long => "long",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Focus => "Focus",
            Stage::Short => "Short Break",
            Stage::Long => "Long Break",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" => Ok(Stage::Focus),
            "short" => Ok(Stage::Short),
            "long" => Ok(Stage::Long),
            _ => Err(ValidationError::UnknownName {
                kind: "stage",
                value: s.to_string(),
            }),
        }
    }
}

/// Fixed stage rotation: focus, short, focus, long, then repeat.
pub const ROTATION: [Stage; 4] = [Stage::Focus, Stage::Short, Stage::Focus, Stage::Long];

/// Position inside [`ROTATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(usize);

impl Rotation {
    /// Returns `None` for an out-of-range persisted index.
    pub fn at(index: usize) -> Option<Self> {
        (index < ROTATION.len()).then_some(Self(index))
    }

    /// First rotation slot for `stage`, used when the user picks a stage.
    pub fn starting_at(stage: Stage) -> Self {
        let index = ROTATION.iter().position(|s| *s == stage).unwrap_or(0);
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn stage(self) -> Stage {
        ROTATION[self.0]
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % ROTATION.len())
    }
}

/// Configured stage lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDurations {
    pub focus_secs: i64,
    pub short_secs: i64,
    pub long_secs: i64,
}

impl StageDurations {
    pub fn from_minutes(focus: u32, short: u32, long: u32) -> Self {
        Self {
            focus_secs: i64::from(focus) * 60,
            short_secs: i64::from(short) * 60,
            long_secs: i64::from(long) * 60,
        }
    }

    pub fn for_stage(&self, stage: Stage) -> i64 {
        match stage {
            Stage::Focus => self.focus_secs,
            Stage::Short => self.short_secs,
            Stage::Long => self.long_secs,
        }
    }
}

impl Default for StageDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}
