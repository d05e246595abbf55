//! Widget snapshots and presets on top of the kv table.
//!
//! Reads never fail: a missing, unreadable or malformed record is reported as
//! absent. Snapshot writes log on failure instead of returning an error.

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Database, Preset};
use crate::error::{CoreError, ValidationError};
use crate::lock;
use crate::timer::{Snapshot, TimerId};

pub const PRESETS_KEY: &str = "presets";

pub struct SnapshotStore {
    db: Mutex<Database>,
}

impl SnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Store at `<data_dir>/tabtimer.db`.
    pub fn open() -> Result<Self, CoreError> {
        Ok(Self::new(Database::open()?))
    }

    pub fn in_memory() -> Result<Self, CoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// The stored record for `id`, untouched.
    pub fn raw(&self, id: TimerId) -> Option<String> {
        match lock(&self.db).kv_get(id.as_str()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%id, error = %e, "snapshot read failed");
                None
            }
        }
    }

    pub fn load<T>(&self, id: TimerId) -> Option<T>
    where
        T: DeserializeOwned + Snapshot,
    {
        let raw = self.raw(id)?;
        match serde_json::from_str::<T>(&raw) {
            Ok(snapshot) if snapshot.is_valid() => Some(snapshot),
            Ok(_) => {
                tracing::warn!(%id, "discarding snapshot with invalid values");
                None
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "discarding malformed snapshot");
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, id: TimerId, snapshot: &T) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(%id, error = %e, "snapshot serialization failed");
                return;
            }
        };
        if let Err(e) = lock(&self.db).kv_set(id.as_str(), &json) {
            tracing::warn!(%id, error = %e, "snapshot write failed");
        }
    }

    pub fn clear(&self, id: TimerId) {
        if let Err(e) = lock(&self.db).kv_delete(id.as_str()) {
            tracing::warn!(%id, error = %e, "snapshot delete failed");
        }
    }

    pub fn presets(&self) -> Vec<Preset> {
        let raw = match lock(&self.db).kv_get(PRESETS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "preset read failed");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding malformed preset list");
            Vec::new()
        })
    }

    pub fn preset(&self, id: &str) -> Option<Preset> {
        self.presets().into_iter().find(|p| p.id == id)
    }

    pub fn save_presets(&self, presets: &[Preset]) -> Result<(), CoreError> {
        let json = serde_json::to_string(presets)?;
        lock(&self.db).kv_set(PRESETS_KEY, &json)?;
        Ok(())
    }

    pub fn add_preset(&self, preset: Preset) -> Result<(), CoreError> {
        let mut presets = self.presets();
        presets.push(preset);
        self.save_presets(&presets)
    }

    /// # Errors
    /// `ValidationError::PresetNotFound` for an unknown id.
    pub fn remove_preset(&self, id: &str) -> Result<Preset, CoreError> {
        let mut presets = self.presets();
        let index = presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ValidationError::PresetNotFound(id.to_string()))?;
        let removed = presets.remove(index);
        self.save_presets(&presets)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{PomodoroSnapshot, Stage, TimeInput, TimerSnapshot};

    fn store() -> SnapshotStore {
        SnapshotStore::in_memory().unwrap()
    }

    fn put(store: &SnapshotStore, id: TimerId, raw: &str) {
        lock(&store.db).kv_set(id.as_str(), raw).unwrap();
    }

    #[test]
    fn minimal_record_loads_with_defaults() {
        let s = store();
        put(
            &s,
            TimerId::Pomodoro,
            r#"{"duration": 42, "label": "x", "isAudioEnabled": true}"#,
        );
        let snap: PomodoroSnapshot = s.load(TimerId::Pomodoro).unwrap();
        assert_eq!(snap.duration, 42);
        assert_eq!(snap.label, "x");
        assert_eq!(snap.stage, Stage::Focus);
        assert!(!snap.running);
    }

    #[test]
    fn malformed_and_invalid_records_are_absent() {
        let s = store();
        put(&s, TimerId::Timer, "{not json");
        assert!(s.load::<TimerSnapshot>(TimerId::Timer).is_none());
        put(&s, TimerId::Timer, r#"{"duration": -4}"#);
        assert!(s.load::<TimerSnapshot>(TimerId::Timer).is_none());
        put(&s, TimerId::Pomodoro, r#"{"duration": 3, "stage": "nap"}"#);
        assert!(s.load::<PomodoroSnapshot>(TimerId::Pomodoro).is_none());
    }

    #[test]
    fn save_then_clear() {
        let s = store();
        let snap = TimerSnapshot {
            duration: 30,
            label: String::new(),
            is_audio_enabled: false,
            running: false,
            saved_at: None,
            input: TimeInput::new(0, 0, 30),
            preset_id: None,
        };
        s.save(TimerId::Timer, &snap);
        assert_eq!(s.load::<TimerSnapshot>(TimerId::Timer), Some(snap));
        assert!(s.raw(TimerId::Timer).unwrap().contains("isAudioEnabled"));
        s.clear(TimerId::Timer);
        assert!(s.raw(TimerId::Timer).is_none());
    }

    #[test]
    fn presets_add_and_remove() {
        let s = store();
        assert!(s.presets().is_empty());
        let tea = Preset::new("Tea", TimeInput::new(0, 3, 0));
        s.add_preset(tea.clone()).unwrap();
        s.add_preset(Preset::new("Nap", TimeInput::new(0, 20, 0))).unwrap();
        assert_eq!(s.presets().len(), 2);
        assert_eq!(s.preset(&tea.id), Some(tea.clone()));

        assert_eq!(s.remove_preset(&tea.id).unwrap(), tea);
        assert!(matches!(
            s.remove_preset(&tea.id),
            Err(CoreError::Validation(ValidationError::PresetNotFound(_)))
        ));
        assert_eq!(s.presets().len(), 1);
    }
}
