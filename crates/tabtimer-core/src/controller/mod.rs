//! Widget controllers: the control surface host widgets call.
//!
//! A controller wraps one pure widget state machine and performs everything
//! around it: scheduler lifecycle, title arbitration, indicator, persistence,
//! mirror and alarm. Controllers are cheap to clone and every method is
//! synchronous; scheduler work is spawned on the session runtime.
//!
//! Lock order, outermost first: subscription handler, widget, then the
//! session services (registry, chrome, store, mirror), then the scheduler
//! slot table. Controller methods release the widget before creating or
//! rebinding a scheduler.

mod pomodoro;
mod stopwatch;
mod timer;

pub use pomodoro::PomodoroController;
pub use stopwatch::StopwatchController;
pub use timer::TimerController;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::runtime::Handle;

use crate::alarm::AlarmPlayer;
use crate::chrome::Chrome;
use crate::events::{Event, EventSink};
use crate::mirror::{MirrorAction, MirrorActions, MirrorSync};
use crate::registry::RunningRegistry;
use crate::scheduler::SchedulerHandle;
use crate::storage::{Config, SnapshotStore};
use crate::timer::{TimerId, WidgetState};

/// Controls every widget has.
pub trait WidgetControl: Send + Sync {
    fn id(&self) -> TimerId;

    fn state(&self) -> WidgetState;

    /// Returns false when the widget cannot start (already running, nothing
    /// to count down).
    fn start(&self) -> bool;

    fn stop(&self) -> bool;

    /// Stop when running, start otherwise. Returns whether it runs now.
    fn toggle(&self) -> bool;

    /// Back to idle. Deletes the stored snapshot and closes the mirror.
    fn reset(&self);

    fn set_label(&self, label: String);

    fn set_audio_enabled(&self, enabled: bool);

    /// Open or close the companion view. Returns whether it is open now.
    fn toggle_mirror(&self) -> bool;

    /// Tear down the scheduler and save state for the next mount.
    fn unmount(&self);
}

/// Everything a controller shares with the other widgets of a session.
pub struct Services {
    pub config: Config,
    pub registry: RunningRegistry,
    pub chrome: Chrome,
    pub mirror: MirrorSync,
    pub store: SnapshotStore,
    pub alarm: Arc<dyn AlarmPlayer>,
    pub events: EventSink,
    pub runtime: Handle,
}

impl Services {
    pub(crate) fn scheduler(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.runtime.clone(), self.config.tick_settings())
    }

    pub(crate) fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    /// Record `id` as running and show its badge.
    pub(crate) fn claim(&self, id: TimerId) {
        self.registry.add_to_running(id);
        self.chrome.set_indicator(id, true);
    }

    /// Drop `id` from the running set. The title goes back to its default
    /// when `id` owned it.
    pub(crate) fn release(&self, id: TimerId) {
        let owned_title = self.registry.is_last_running_timer(id);
        self.registry.remove_from_running(id);
        self.chrome.set_indicator(id, false);
        if owned_title || self.registry.is_empty() {
            self.chrome.reset_title();
        }
    }

    /// Write the page title, but only for the last running timer.
    pub(crate) fn publish_title(&self, id: TimerId, title: String) {
        if self.registry.is_last_running_timer(id) {
            self.chrome.set_title(title);
        }
    }

    /// A dirty widget is saved, a clean one has no record.
    pub(crate) fn persist<S: Serialize>(&self, id: TimerId, dirty: bool, snapshot: &S) {
        if dirty {
            self.store.save(id, snapshot);
        } else {
            self.store.clear(id);
        }
    }
}

/// Widget plus the number of the run its scheduler belongs to. Every start
/// begins a new run; a tick carrying another run number is late and ignored.
#[derive(Debug)]
pub(crate) struct Live<W> {
    pub(crate) widget: W,
    pub(crate) run: u64,
}

impl<W> Live<W> {
    pub(crate) fn new(widget: W) -> Self {
        Self { widget, run: 0 }
    }

    pub(crate) fn next_run(&mut self) -> u64 {
        self.run += 1;
        self.run
    }
}

pub(crate) fn toggle_label(running: bool) -> String {
    if running { "Stop" } else { "Start" }.to_string()
}

pub(crate) fn mirror_actions(running: bool, toggle: MirrorAction) -> MirrorActions {
    MirrorActions {
        toggle,
        toggle_label: toggle_label(running),
    }
}

pub(crate) fn stopped_event(id: TimerId) -> Event {
    Event::TimerStopped { id, at: Utc::now() }
}

pub(crate) fn reset_event(id: TimerId) -> Event {
    Event::TimerReset { id, at: Utc::now() }
}
