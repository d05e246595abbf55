//! The isolated tick worker.
//!
//! A worker owns its clock and nothing else. It receives [`Control`] messages
//! and posts [`TickMessage`]s; it never sees widget state.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use super::{
    Control, DriftCorrector, StartRequest, TickMessage, TickMode, Wake, COUNTDOWN_DONE,
    COUNTDOWN_INTERVAL,
};
use crate::timer::TimerId;

pub(crate) struct TickScheduler {
    id: TimerId,
    mode: TickMode,
    interval: Duration,
    /// Ticks emitted in count-up mode.
    count: u64,
}

impl TickScheduler {
    /// `interval` paces count-up mode only; a countdown wakes once per
    /// second whatever is passed.
    pub(crate) fn new(request: StartRequest, interval: Duration) -> Self {
        let interval = match request.mode {
            TickMode::Countdown { .. } => COUNTDOWN_INTERVAL,
            TickMode::CountUp { .. } => interval.max(Duration::from_millis(1)),
        };
        Self {
            id: request.id,
            mode: request.mode,
            interval,
            count: 0,
        }
    }

    /// Runs until `Stop`, until the control side is dropped or until nobody
    /// listens for ticks anymore.
    pub(crate) async fn run(
        mut self,
        mut control: UnboundedReceiver<Control>,
        ticks: UnboundedSender<TickMessage>,
    ) {
        let origin = Instant::now();
        let interval_ms = self.interval.as_millis() as u64;
        let mut drift = DriftCorrector::new(interval_ms, 0);
        let mut next_wake = origin + self.interval;
        // Countdown reached zero; wait for a new duration or a stop.
        let mut halted = false;

        tracing::debug!(id = %self.id, interval_ms, "tick scheduler started");

        loop {
            if halted {
                match control.recv().await {
                    Some(Control::UpdateDuration(duration)) => {
                        self.set_duration(duration);
                        let now = Instant::now();
                        drift.restart(millis_since(origin, now));
                        next_wake = now + self.interval;
                        halted = false;
                    }
                    Some(Control::Stop) | None => break,
                }
                continue;
            }

            tokio::select! {
                biased;
                msg = control.recv() => match msg {
                    Some(Control::UpdateDuration(duration)) => self.set_duration(duration),
                    Some(Control::Stop) | None => break,
                },
                () = tokio::time::sleep_until(next_wake) => {
                    let now = Instant::now();
                    let wake = drift.wake(millis_since(origin, now));
                    next_wake = now + Duration::from_millis(wake.next_delay);
                    let (tick, done) = self.advance(wake);
                    if ticks.send(tick).is_err() {
                        break;
                    }
                    halted = done;
                }
            }
        }

        tracing::debug!(id = %self.id, "tick scheduler stopped");
    }

    fn set_duration(&mut self, duration: i64) {
        match &mut self.mode {
            TickMode::Countdown { duration: remaining } => *remaining = duration,
            TickMode::CountUp { .. } => {
                tracing::debug!(id = %self.id, "duration update ignored by count-up scheduler");
            }
        }
    }

    /// Advance the logical clock by one interval. The flag is set on the
    /// countdown wake that exhausts the last second.
    fn advance(&mut self, wake: Wake) -> (TickMessage, bool) {
        match &mut self.mode {
            TickMode::Countdown { duration } => {
                *duration -= 1;
                if *duration <= 0 {
                    (TickMessage::Countdown { duration: COUNTDOWN_DONE }, true)
                } else {
                    (TickMessage::Countdown { duration: *duration }, false)
                }
            }
            TickMode::CountUp { elapsed } => {
                self.count += 1;
                let logical = *elapsed + self.count * self.interval.as_millis() as u64;
                (
                    TickMessage::Elapsed {
                        elapsed: logical,
                        diff: wake.diff.max(0) as u64,
                    },
                    false,
                )
            }
        }
    }
}

fn millis_since(origin: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(origin).as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn spawn(
        request: StartRequest,
        interval: Duration,
    ) -> (
        UnboundedSender<Control>,
        UnboundedReceiver<TickMessage>,
        tokio::task::JoinHandle<()>,
    ) {
        let (ctl_tx, ctl_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(TickScheduler::new(request, interval).run(ctl_rx, tick_tx));
        (ctl_tx, tick_rx, task)
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_emits_once_per_second_then_sentinel() {
        let (_ctl, mut ticks, _task) = spawn(
            StartRequest::countdown(TimerId::Timer, 3),
            Duration::from_secs(1),
        );
        let start = Instant::now();
        let mut seen = Vec::new();
        for _ in 0..3 {
            match ticks.recv().await {
                Some(TickMessage::Countdown { duration }) => seen.push(duration),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(seen, vec![2, 1, COUNTDOWN_DONE]);
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        // Halted: nothing more arrives.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(ticks.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ignores_a_shorter_interval() {
        let (_ctl, mut ticks, _task) = spawn(
            StartRequest::countdown(TimerId::Timer, 10),
            Duration::from_millis(500),
        );
        tokio::time::sleep(Duration::from_millis(2_600)).await;
        let mut last = None;
        while let Ok(TickMessage::Countdown { duration }) = ticks.try_recv() {
            last = Some(duration);
        }
        assert_eq!(last, Some(8));
    }

    #[tokio::test(start_paused = true)]
    async fn update_duration_rearms_a_halted_countdown() {
        let (ctl, mut ticks, _task) = spawn(
            StartRequest::countdown(TimerId::Pomodoro, 1),
            Duration::from_secs(1),
        );
        assert_eq!(
            ticks.recv().await,
            Some(TickMessage::Countdown { duration: COUNTDOWN_DONE })
        );
        ctl.send(Control::UpdateDuration(2)).unwrap();
        assert_eq!(ticks.recv().await, Some(TickMessage::Countdown { duration: 1 }));
        assert_eq!(
            ticks.recv().await,
            Some(TickMessage::Countdown { duration: COUNTDOWN_DONE })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn update_duration_keeps_schedule_while_running() {
        let (ctl, mut ticks, _task) = spawn(
            StartRequest::countdown(TimerId::Pomodoro, 100),
            Duration::from_secs(1),
        );
        assert_eq!(ticks.recv().await, Some(TickMessage::Countdown { duration: 99 }));
        let before = Instant::now();
        tokio::time::sleep(Duration::from_millis(400)).await;
        ctl.send(Control::UpdateDuration(10)).unwrap();
        assert_eq!(ticks.recv().await, Some(TickMessage::Countdown { duration: 9 }));
        assert_eq!(before.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn count_up_advances_logical_clock() {
        let (ctl, mut ticks, task) = spawn(
            StartRequest::count_up(TimerId::Stopwatch, 1_000),
            Duration::from_millis(10),
        );
        let mut last = 0;
        for _ in 0..5 {
            if let Some(TickMessage::Elapsed { elapsed, diff }) = ticks.recv().await {
                assert_eq!(diff, 0);
                last = elapsed;
            }
        }
        assert_eq!(last, 1_050);
        ctl.send(Control::Stop).unwrap();
        task.await.unwrap();
        // Anything already queued is finite; the channel then closes.
        while ticks.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_worker() {
        let (ctl, _ticks, task) = spawn(
            StartRequest::countdown(TimerId::Timer, 10),
            Duration::from_secs(1),
        );
        ctl.send(Control::Stop).unwrap();
        task.await.unwrap();
    }
}
