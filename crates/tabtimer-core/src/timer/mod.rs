mod countdown;
mod format;
mod id;
mod input;
mod pomodoro;
pub mod snapshot;
mod stage;
mod stopwatch;

use serde::Serialize;

pub use countdown::{CountdownTick, TimerWidget};
pub use format::Display;
pub use id::TimerId;
pub use input::{TimeInput, MAX_HOURS};
pub use pomodoro::{PomodoroTick, PomodoroWidget};
pub use snapshot::{PomodoroSnapshot, Snapshot, StopwatchSnapshot, TimerSnapshot};
pub use stage::{Rotation, Stage, StageDurations, ROTATION};
pub use stopwatch::{Split, StopwatchTick, StopwatchWidget};

/// Read-only view of a widget handed to the host for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    pub id: TimerId,
    pub running: bool,
    pub dirty: bool,
    pub ringing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<u64>,
    pub display: Display,
    pub label: String,
    pub audio_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<Split>,
}

impl WidgetState {
    /// Page-title text: display followed by the label or the widget name.
    pub fn title(&self) -> String {
        title_for(self.id, &self.display, &self.label)
    }
}

/// `"<display> - <label>"`, falling back to the widget name for an empty
/// label. Sub-second digits never reach the title.
pub fn title_for(id: TimerId, display: &Display, label: &str) -> String {
    let name = if label.is_empty() {
        id.display_name()
    } else {
        label
    };
    format!("{} - {}", display.whole_seconds(), name)
}
