//! Drift-corrected wake schedule.
//!
//! Every wake measures how late it is against the logical clock, advances the
//! logical clock by exactly one interval and sleeps `interval - diff` before
//! the next wake. Lateness never accumulates: a wake that is `d` ms late is
//! followed by a wait that is `d` ms shorter.

/// Result of one wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    /// Milliseconds between the scheduled and the actual wake. Negative when
    /// the host fired early.
    pub diff: i64,
    /// Milliseconds to wait before the next wake.
    pub next_delay: u64,
}

/// Pure wake arithmetic in milliseconds since an arbitrary origin.
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    interval: u64,
    expected: u64,
}

impl DriftCorrector {
    /// First wake is due one interval after `now`.
    pub fn new(interval_ms: u64, now: u64) -> Self {
        let interval = interval_ms.max(1);
        Self {
            interval,
            expected: now + interval,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Logical time of the next wake.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Re-anchor after an idle period (countdown re-armed).
    pub fn restart(&mut self, now: u64) {
        self.expected = now + self.interval;
    }

    pub fn wake(&mut self, now: u64) -> Wake {
        let diff = now as i64 - self.expected as i64;
        self.expected += self.interval;
        let next_delay = (self.interval as i64 - diff).max(0) as u64;
        Wake { diff, next_delay }
    }
}
