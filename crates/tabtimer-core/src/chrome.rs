//! Shared page chrome: the document title and the per-widget "running" badge.
//!
//! Who may write the title is decided by [`crate::registry::RunningRegistry`];
//! this type only stores the value and reports changes.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::events::{Event, EventSink};
use crate::lock;
use crate::timer::TimerId;

pub const DEFAULT_TITLE: &str = "New Tab";

#[derive(Debug, Default)]
struct ChromeState {
    /// `None` while the default title is shown.
    title: Option<String>,
    indicators: BTreeSet<TimerId>,
}

#[derive(Debug)]
pub struct Chrome {
    default_title: String,
    state: Mutex<ChromeState>,
    events: EventSink,
}

impl Chrome {
    pub fn new(default_title: impl Into<String>, events: EventSink) -> Self {
        Self {
            default_title: default_title.into(),
            state: Mutex::new(ChromeState::default()),
            events,
        }
    }

    pub fn title(&self) -> String {
        lock(&self.state)
            .title
            .clone()
            .unwrap_or_else(|| self.default_title.clone())
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    pub fn is_default_title(&self) -> bool {
        lock(&self.state).title.is_none()
    }

    /// Returns false when the title already had this text.
    pub fn set_title(&self, title: String) -> bool {
        {
            let mut state = lock(&self.state);
            if state.title.as_deref() == Some(title.as_str()) {
                return false;
            }
            state.title = Some(title.clone());
        }
        self.events.emit(Event::TitleChanged { title });
        true
    }

    pub fn reset_title(&self) {
        let changed = lock(&self.state).title.take().is_some();
        if changed {
            self.events.emit(Event::TitleReset {
                title: self.default_title.clone(),
            });
        }
    }

    pub fn set_indicator(&self, id: TimerId, visible: bool) {
        let changed = {
            let mut state = lock(&self.state);
            if visible {
                state.indicators.insert(id)
            } else {
                state.indicators.remove(&id)
            }
        };
        if changed {
            self.events.emit(Event::IndicatorChanged { id, visible });
        }
    }

    pub fn indicator(&self, id: TimerId) -> bool {
        lock(&self.state).indicators.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn title_changes_are_deduplicated() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chrome = Chrome::new(DEFAULT_TITLE, EventSink::new(tx));
        assert!(chrome.set_title("5 - Timer".into()));
        assert!(!chrome.set_title("5 - Timer".into()));
        assert_eq!(chrome.title(), "5 - Timer");
        chrome.reset_title();
        chrome.reset_title();
        assert_eq!(chrome.title(), DEFAULT_TITLE);

        assert_eq!(
            rx.try_recv().unwrap(),
            Event::TitleChanged {
                title: "5 - Timer".into()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::TitleReset {
                title: DEFAULT_TITLE.into()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn indicators_are_per_widget() {
        let chrome = Chrome::new(DEFAULT_TITLE, EventSink::detached());
        chrome.set_indicator(TimerId::Timer, true);
        assert!(chrome.indicator(TimerId::Timer));
        assert!(!chrome.indicator(TimerId::Stopwatch));
        chrome.set_indicator(TimerId::Timer, false);
        assert!(!chrome.indicator(TimerId::Timer));
    }
}
