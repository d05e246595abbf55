//! Companion view sync.
//!
//! A mirror is a secondary surface (picture-in-picture window, terminal status
//! line, ...) that echoes one widget's display. The surface backend belongs to
//! the host and is reached through [`MirrorSurface`]; [`MirrorSync`] tracks
//! which widgets have a mirror open and which control callbacks each mirror
//! may invoke.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::events::{Event, EventSink};
use crate::lock;
use crate::timer::{Display, Stage, TimerId};

/// Values pushed to an open mirror on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorData {
    pub display: Display,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// A control the surface can invoke without holding on to widget internals.
pub type MirrorAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct MirrorActions {
    pub toggle: MirrorAction,
    /// Caption for the toggle control ("Start" / "Stop").
    pub toggle_label: String,
}

impl std::fmt::Debug for MirrorActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorActions")
            .field("toggle_label", &self.toggle_label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub name: TimerId,
    pub title: String,
    pub data: MirrorData,
    pub actions: MirrorActions,
}

/// Host backend for secondary surfaces.
pub trait MirrorSurface: Send + Sync {
    fn is_supported(&self) -> bool;
    fn open(&self, name: TimerId, title: &str, data: &MirrorData);
    fn render(&self, name: TimerId, data: &MirrorData);
    fn close(&self, name: TimerId);
}

/// Backend for hosts without secondary surfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSurface;

impl MirrorSurface for UnsupportedSurface {
    fn is_supported(&self) -> bool {
        false
    }
    fn open(&self, _name: TimerId, _title: &str, _data: &MirrorData) {}
    fn render(&self, _name: TimerId, _data: &MirrorData) {}
    fn close(&self, _name: TimerId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorFrame {
    Opened {
        name: TimerId,
        title: String,
        data: MirrorData,
    },
    Rendered {
        name: TimerId,
        data: MirrorData,
    },
    Closed {
        name: TimerId,
    },
}

/// Keeps every call in memory.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    frames: Mutex<Vec<MirrorFrame>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<MirrorFrame> {
        lock(&self.frames).clone()
    }

    /// Most recent data shown for `name`, opened or rendered.
    pub fn last_data(&self, name: TimerId) -> Option<MirrorData> {
        lock(&self.frames).iter().rev().find_map(|frame| match frame {
            MirrorFrame::Opened { name: n, data, .. } | MirrorFrame::Rendered { name: n, data }
                if *n == name =>
            {
                Some(data.clone())
            }
            _ => None,
        })
    }
}

impl MirrorSurface for RecordingSurface {
    fn is_supported(&self) -> bool {
        true
    }

    fn open(&self, name: TimerId, title: &str, data: &MirrorData) {
        lock(&self.frames).push(MirrorFrame::Opened {
            name,
            title: title.to_string(),
            data: data.clone(),
        });
    }

    fn render(&self, name: TimerId, data: &MirrorData) {
        lock(&self.frames).push(MirrorFrame::Rendered {
            name,
            data: data.clone(),
        });
    }

    fn close(&self, name: TimerId) {
        lock(&self.frames).push(MirrorFrame::Closed { name });
    }
}

/// Open mirrors of one session, at most one per widget.
pub struct MirrorSync {
    surface: Arc<dyn MirrorSurface>,
    enabled: bool,
    open: Mutex<HashMap<TimerId, MirrorActions>>,
    events: EventSink,
}

impl MirrorSync {
    pub fn new(surface: Arc<dyn MirrorSurface>, enabled: bool, events: EventSink) -> Self {
        Self {
            surface,
            enabled,
            open: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Hosts hide every mirror control when this is false.
    pub fn is_supported(&self) -> bool {
        self.enabled && self.surface.is_supported()
    }

    pub fn is_open(&self, name: TimerId) -> bool {
        lock(&self.open).contains_key(&name)
    }

    /// Close the mirror for `request.name` if open, open it otherwise.
    /// Returns whether the mirror is open afterwards.
    pub fn toggle(&self, request: MirrorRequest) -> bool {
        if !self.is_supported() {
            return false;
        }
        if self.is_open(request.name) {
            self.close(request.name);
            false
        } else {
            self.open(request);
            true
        }
    }

    /// Open a mirror. An already open mirror for the same widget is replaced.
    pub fn open(&self, request: MirrorRequest) {
        if !self.is_supported() {
            return;
        }
        let MirrorRequest {
            name,
            title,
            data,
            actions,
        } = request;
        let replaced = lock(&self.open).insert(name, actions).is_some();
        if replaced {
            self.surface.close(name);
        }
        self.surface.open(name, &title, &data);
        if !replaced {
            self.events.emit(Event::MirrorOpened { id: name });
        }
    }

    /// No-op unless a mirror for `name` is open.
    pub fn update(&self, name: TimerId, data: &MirrorData) {
        if self.is_open(name) {
            self.surface.render(name, data);
        }
    }

    pub fn update_actions(&self, name: TimerId, actions: MirrorActions) {
        if let Some(slot) = lock(&self.open).get_mut(&name) {
            *slot = actions;
        }
    }

    pub fn close(&self, name: TimerId) {
        let was_open = lock(&self.open).remove(&name).is_some();
        if was_open {
            self.surface.close(name);
            self.events.emit(Event::MirrorClosed { id: name });
        }
    }

    pub fn close_all(&self) {
        let names: Vec<TimerId> = lock(&self.open).keys().copied().collect();
        for name in names {
            self.close(name);
        }
    }

    /// Caption of the toggle control bound to an open mirror.
    pub fn toggle_label(&self, name: TimerId) -> Option<String> {
        lock(&self.open).get(&name).map(|a| a.toggle_label.clone())
    }

    /// Invoke the toggle bound to an open mirror, as the surface's control
    /// button does. Returns false when no mirror is open for `name`.
    pub fn press(&self, name: TimerId) -> bool {
        let action = lock(&self.open).get(&name).map(|a| Arc::clone(&a.toggle));
        match action {
            // The action may reach back into this mirror.
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for MirrorSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSync")
            .field("enabled", &self.enabled)
            .field("open", &lock(&self.open).keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
