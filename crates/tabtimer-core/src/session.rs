//! One page's worth of timer engine.
//!
//! A [`Session`] owns the services shared by all widgets (running-timer
//! registry, page chrome, mirror, snapshot store, alarm) and mounts the three
//! widget controllers against them. The host drains [`Event`]s from the
//! receiver returned by [`Session::new`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::alarm::AlarmPlayer;
use crate::chrome::Chrome;
use crate::controller::{
    PomodoroController, Services, StopwatchController, TimerController, WidgetControl,
};
use crate::error::CoreError;
use crate::events::{Event, EventSink};
use crate::mirror::{MirrorSurface, MirrorSync};
use crate::registry::RunningRegistry;
use crate::storage::{Config, SnapshotStore};
use crate::timer::TimerId;

pub struct Session {
    services: Arc<Services>,
    timer: TimerController,
    stopwatch: StopwatchController,
    pomodoro: PomodoroController,
}

impl Session {
    /// Mount all widgets. Widgets whose snapshot was saved while running
    /// start ticking again right away.
    ///
    /// # Errors
    /// `CoreError::Runtime` when called outside a tokio runtime.
    pub fn new(
        config: Config,
        store: SnapshotStore,
        surface: Arc<dyn MirrorSurface>,
        alarm: Arc<dyn AlarmPlayer>,
    ) -> Result<(Self, UnboundedReceiver<Event>), CoreError> {
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSink::new(tx);

        let services = Arc::new(Services {
            registry: RunningRegistry::new(),
            chrome: Chrome::new(config.default_title.clone(), events.clone()),
            mirror: MirrorSync::new(surface, config.mirror_enabled, events.clone()),
            store,
            alarm,
            events,
            runtime,
            config,
        });

        let timer = TimerController::mount(Arc::clone(&services));
        let stopwatch = StopwatchController::mount(Arc::clone(&services));
        let pomodoro = PomodoroController::mount(Arc::clone(&services));
        tracing::debug!(running = ?services.registry.running(), "session mounted");

        Ok((
            Self {
                services,
                timer,
                stopwatch,
                pomodoro,
            },
            rx,
        ))
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn stopwatch(&self) -> &StopwatchController {
        &self.stopwatch
    }

    pub fn pomodoro(&self) -> &PomodoroController {
        &self.pomodoro
    }

    /// Common controls of the widget `id`.
    pub fn widget(&self, id: TimerId) -> &dyn WidgetControl {
        match id {
            TimerId::Timer => &self.timer,
            TimerId::Stopwatch => &self.stopwatch,
            TimerId::Pomodoro => &self.pomodoro,
        }
    }

    pub fn config(&self) -> &Config {
        &self.services.config
    }

    pub fn registry(&self) -> &RunningRegistry {
        &self.services.registry
    }

    pub fn chrome(&self) -> &Chrome {
        &self.services.chrome
    }

    pub fn mirror(&self) -> &MirrorSync {
        &self.services.mirror
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.services.store
    }

    /// Unmount every widget: schedulers stop, state is saved for the next
    /// session and the title returns to its default.
    pub fn shutdown(&self) {
        for id in TimerId::ALL {
            self.widget(id).unmount();
        }
        self.services.chrome.reset_title();
        tracing::debug!("session shut down");
    }
}
