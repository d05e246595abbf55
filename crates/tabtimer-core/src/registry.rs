//! Running-timer registry.
//!
//! Insertion-ordered set of running timers, shared by all widgets of one
//! session. The most recently added timer still present owns the page title.

use std::sync::{Arc, Mutex};

use crate::lock;
use crate::timer::TimerId;

#[derive(Debug, Clone, Default)]
pub struct RunningRegistry {
    running: Arc<Mutex<Vec<TimerId>>>,
}

impl RunningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless already present. An id that is present keeps its
    /// original position.
    pub fn add_to_running(&self, id: TimerId) {
        let mut running = lock(&self.running);
        if !running.contains(&id) {
            running.push(id);
        }
    }

    pub fn remove_from_running(&self, id: TimerId) {
        lock(&self.running).retain(|r| *r != id);
    }

    /// True iff `id` is the most recently added timer still running.
    pub fn is_last_running_timer(&self, id: TimerId) -> bool {
        lock(&self.running).last() == Some(&id)
    }

    pub fn is_running(&self, id: TimerId) -> bool {
        lock(&self.running).contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.running).is_empty()
    }

    /// Running timers in start order.
    pub fn running(&self) -> Vec<TimerId> {
        lock(&self.running).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_the_newest_hands_ownership_back() {
        let r = RunningRegistry::new();
        r.add_to_running(TimerId::Timer);
        r.add_to_running(TimerId::Pomodoro);
        assert!(r.is_last_running_timer(TimerId::Pomodoro));
        assert!(!r.is_last_running_timer(TimerId::Timer));
        r.remove_from_running(TimerId::Pomodoro);
        assert!(r.is_last_running_timer(TimerId::Timer));
    }

    #[test]
    fn re_adding_keeps_position() {
        let r = RunningRegistry::new();
        r.add_to_running(TimerId::Timer);
        r.add_to_running(TimerId::Stopwatch);
        r.add_to_running(TimerId::Timer);
        assert_eq!(r.running(), vec![TimerId::Timer, TimerId::Stopwatch]);
        assert!(r.is_last_running_timer(TimerId::Stopwatch));
    }

    #[test]
    fn removal_of_absent_id_is_noop() {
        let r = RunningRegistry::new();
        r.remove_from_running(TimerId::Timer);
        assert!(r.is_empty());
        assert!(!r.is_last_running_timer(TimerId::Timer));
    }

    #[test]
    fn clones_share_state() {
        let r = RunningRegistry::new();
        let other = r.clone();
        other.add_to_running(TimerId::Pomodoro);
        assert!(r.is_running(TimerId::Pomodoro));
    }
}
