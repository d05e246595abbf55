use serde::{Deserialize, Serialize};

use crate::timer::TimeInput;

/// Named duration template. Written by preset management only; widgets
/// read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl Preset {
    /// New preset with a generated id. The time is stored normalized.
    pub fn new(name: impl Into<String>, input: TimeInput) -> Self {
        let input = input.normalized();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            hours: input.hours,
            minutes: input.minutes,
            seconds: input.seconds,
        }
    }

    pub fn input(&self) -> TimeInput {
        TimeInput::new(self.hours, self.minutes, self.seconds)
    }

    pub fn total_secs(&self) -> i64 {
        self.input().normalized().total_secs()
    }
}
