use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::timer::{Stage, TimerId};

/// Everything the engine reports to the host.
/// The host drains these from the session's event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        id: TimerId,
        /// Countdown seconds, or elapsed milliseconds for the stopwatch.
        from: i64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        id: TimerId,
        at: DateTime<Utc>,
    },
    TimerReset {
        id: TimerId,
        at: DateTime<Utc>,
    },
    /// New display value for a running widget.
    TimerTick {
        id: TimerId,
        display: String,
    },
    TimerCompleted {
        id: TimerId,
        at: DateTime<Utc>,
    },
    AlarmTriggered {
        id: TimerId,
        audible: bool,
        at: DateTime<Utc>,
    },
    StageAdvanced {
        from: Stage,
        to: Stage,
        duration_secs: i64,
        at: DateTime<Utc>,
    },
    SplitRecorded {
        elapsed: String,
        diff: String,
        at: DateTime<Utc>,
    },
    TitleChanged {
        title: String,
    },
    /// Title went back to its default text.
    TitleReset {
        title: String,
    },
    /// "Something is running" badge for one widget.
    IndicatorChanged {
        id: TimerId,
        visible: bool,
    },
    MirrorOpened {
        id: TimerId,
    },
    MirrorClosed {
        id: TimerId,
    },
}

/// Sending half of the host's event channel. Events are dropped silently
/// once the host stops listening.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<UnboundedSender<Event>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<Event>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink nobody listens to.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: Event) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let value = serde_json::to_value(Event::IndicatorChanged {
            id: TimerId::Timer,
            visible: true,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "IndicatorChanged", "id": "timer", "visible": true})
        );
    }

    #[test]
    fn emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(tx).emit(Event::TitleChanged { title: "x".into() });
        EventSink::detached().emit(Event::TitleChanged { title: "y".into() });
    }
}
