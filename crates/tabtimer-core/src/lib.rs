//! # Tabtimer Core Library
//!
//! Timer engine for the Timer, Stopwatch and Pomodoro widgets of a new-tab
//! page. The host (a browser page, the bundled CLI) renders; this crate keeps
//! time, arbitrates the shared page title and resumes state after a reload.
//!
//! ## Architecture
//!
//! - **Tick Scheduler**: one tokio task per running widget, drift corrected,
//!   talking to the rest of the engine over channels only
//! - **Scheduler Handle**: per-widget lifecycle of those tasks, with handler
//!   rebinding through versioned subscriptions
//! - **Running-Timer Registry**: start-ordered set deciding who owns the title
//! - **Widgets**: pure state machines turning ticks into display strings
//! - **Mirror**: companion surfaces echoing a widget's display
//!
//! ## Key Components
//!
//! - [`Session`]: composition root wiring everything for one page
//! - [`TimerController`], [`StopwatchController`], [`PomodoroController`]:
//!   the control surface handed to host widgets
//! - [`SnapshotStore`]: persisted widget snapshots and presets
//! - [`Config`]: engine configuration

pub mod alarm;
pub mod chrome;
pub mod controller;
pub mod error;
pub mod events;
pub mod mirror;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod timer;

pub use alarm::{AlarmPlayer, RecordingAlarm, SilentAlarm};
pub use chrome::Chrome;
pub use controller::{PomodoroController, StopwatchController, TimerController, WidgetControl};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, EventSink};
pub use mirror::{MirrorActions, MirrorData, MirrorSurface, MirrorSync, RecordingSurface, UnsupportedSurface};
pub use registry::RunningRegistry;
pub use scheduler::{SchedulerHandle, StartRequest, TickMessage, TickSettings};
pub use session::Session;
pub use storage::{Config, Database, Preset, SnapshotStore};
pub use timer::{Display, Stage, TimeInput, TimerId, WidgetState};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poisoning. A handler that panicked mid-tick leaves plain
/// data behind, never a broken invariant worth propagating.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
