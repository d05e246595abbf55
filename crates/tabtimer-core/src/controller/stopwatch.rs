use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::{mirror_actions, reset_event, stopped_event, Live, Services, WidgetControl};
use crate::events::Event;
use crate::lock;
use crate::mirror::{MirrorAction, MirrorData, MirrorRequest};
use crate::scheduler::{SchedulerHandle, StartRequest, SubscriptionToken, TickHandler, TickMessage};
use crate::timer::snapshot::gap_ms;
use crate::timer::{
    title_for, Snapshot, Split, StopwatchSnapshot, StopwatchTick, StopwatchWidget, TimerId,
    WidgetState,
};

const ID: TimerId = TimerId::Stopwatch;

#[derive(Debug, Clone)]
struct TickContext {
    run: u64,
    label: String,
}

/// Count-up stopwatch with splits.
#[derive(Clone)]
pub struct StopwatchController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<Live<StopwatchWidget>>,
    scheduler: SchedulerHandle,
    services: Arc<Services>,
}

impl StopwatchController {
    pub fn mount(services: Arc<Services>) -> Self {
        let snapshot = services.store.load::<StopwatchSnapshot>(ID);
        let widget = match &snapshot {
            Some(s) => StopwatchWidget::hydrate(s),
            None => StopwatchWidget::new(),
        };
        let controller = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Live::new(widget)),
                scheduler: services.scheduler(),
                services,
            }),
        };
        if let Some(saved_at) = snapshot.as_ref().and_then(|s| s.resumed_from()) {
            let gap = gap_ms(saved_at, Utc::now());
            tracing::debug!(gap_ms = gap, "resuming stopwatch");
            lock(&controller.inner.state).widget.advance(gap);
            controller.inner.start();
        }
        controller
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.state).widget.is_running()
    }

    pub fn elapsed(&self) -> u64 {
        lock(&self.inner.state).widget.elapsed()
    }

    pub fn splits(&self) -> Vec<Split> {
        lock(&self.inner.state).widget.splits().to_vec()
    }

    pub fn token(&self) -> Option<SubscriptionToken> {
        self.inner.scheduler.token(ID)
    }

    /// Capture the current elapsed time. Nothing happens at zero.
    pub fn split(&self) -> Option<Split> {
        let inner = &self.inner;
        let mut live = lock(&inner.state);
        let split = live.widget.split().cloned()?;
        inner.persist(&live.widget);
        inner.services.emit(Event::SplitRecorded {
            elapsed: split.elapsed_string.clone(),
            diff: split.diff_string.clone(),
            at: Utc::now(),
        });
        Some(split)
    }
}

impl WidgetControl for StopwatchController {
    fn id(&self) -> TimerId {
        ID
    }

    fn state(&self) -> WidgetState {
        lock(&self.inner.state).widget.state()
    }

    fn start(&self) -> bool {
        self.inner.start()
    }

    fn stop(&self) -> bool {
        self.inner.stop()
    }

    fn toggle(&self) -> bool {
        if !self.inner.stop() {
            self.inner.start();
        }
        self.is_running()
    }

    fn reset(&self) {
        self.inner.reset();
    }

    fn set_label(&self, label: String) {
        {
            let mut live = lock(&self.inner.state);
            live.widget.set_label(label);
            self.inner.persist(&live.widget);
        }
        self.inner.rebind();
    }

    fn set_audio_enabled(&self, enabled: bool) {
        let mut live = lock(&self.inner.state);
        live.widget.set_audio_enabled(enabled);
        self.inner.persist(&live.widget);
    }

    fn toggle_mirror(&self) -> bool {
        let request = {
            let live = lock(&self.inner.state);
            let widget = &live.widget;
            MirrorRequest {
                name: ID,
                title: if widget.label().is_empty() {
                    ID.display_name().to_string()
                } else {
                    widget.label().to_string()
                },
                data: mirror_data(widget),
                actions: mirror_actions(widget.is_running(), self.inner.toggle_action()),
            }
        };
        self.inner.services.mirror.toggle(request)
    }

    fn unmount(&self) {
        let mut live = lock(&self.inner.state);
        self.inner.scheduler.destroy_worker(ID);
        self.inner.persist(&live.widget);
        // The record keeps the running flag; the live widget is idle.
        live.widget.stop();
        self.inner.services.registry.remove_from_running(ID);
        self.inner.services.chrome.set_indicator(ID, false);
        self.inner.services.mirror.close(ID);
    }
}

impl Inner {
    fn start(self: &Arc<Self>) -> bool {
        let mut live = lock(&self.state);
        let Some(elapsed) = live.widget.start() else {
            return false;
        };
        let run = live.next_run();
        let ctx = TickContext {
            run,
            label: live.widget.label().to_string(),
        };
        self.services.claim(ID);
        self.services
            .publish_title(ID, title_for(ID, &live.widget.display(), &ctx.label));
        self.persist(&live.widget);
        self.refresh_mirror(&live.widget);
        self.services.emit(Event::TimerStarted {
            id: ID,
            from: i64::try_from(elapsed).unwrap_or(i64::MAX),
            at: Utc::now(),
        });
        let request = StartRequest::count_up(ID, elapsed);
        if self.scheduler.init_worker(request, self.handler(ctx)).is_none() {
            tracing::warn!("stopwatch started while its scheduler was still live");
        }
        true
    }

    fn stop(self: &Arc<Self>) -> bool {
        let mut live = lock(&self.state);
        if !live.widget.stop() {
            return false;
        }
        self.scheduler.destroy_worker(ID);
        self.services.release(ID);
        self.persist(&live.widget);
        self.refresh_mirror(&live.widget);
        self.services.emit(stopped_event(ID));
        true
    }

    fn reset(&self) {
        let mut live = lock(&self.state);
        self.scheduler.destroy_worker(ID);
        live.widget.reset();
        self.services.release(ID);
        self.services.store.clear(ID);
        self.services.mirror.close(ID);
        self.services.emit(reset_event(ID));
    }

    fn handler(self: &Arc<Self>, ctx: TickContext) -> TickHandler {
        let inner = Arc::downgrade(self);
        Box::new(move |tick| {
            if let Some(inner) = inner.upgrade() {
                inner.on_tick(tick, &ctx);
            }
        })
    }

    fn rebind(self: &Arc<Self>) {
        loop {
            let ctx = {
                let live = lock(&self.state);
                TickContext {
                    run: live.run,
                    label: live.widget.label().to_string(),
                }
            };
            let run = ctx.run;
            if self.scheduler.rebind(ID, self.handler(ctx)).is_none() {
                return;
            }
            if lock(&self.state).run == run {
                return;
            }
        }
    }

    fn on_tick(&self, tick: TickMessage, ctx: &TickContext) {
        let TickMessage::Elapsed { elapsed, .. } = tick else {
            return;
        };
        let mut live = lock(&self.state);
        if live.run != ctx.run {
            return;
        }
        if let StopwatchTick::Running {
            display,
            second_changed,
        } = live.widget.on_tick(elapsed)
        {
            self.services
                .publish_title(ID, title_for(ID, &display, &ctx.label));
            self.services.mirror.update(ID, &mirror_data(&live.widget));
            // Sub-second ticks are not worth a write.
            if second_changed {
                self.persist(&live.widget);
            }
            self.services.emit(Event::TimerTick {
                id: ID,
                display: display.to_string(),
            });
        }
    }

    fn persist(&self, widget: &StopwatchWidget) {
        let mut snapshot = widget.snapshot();
        if widget.is_running() {
            snapshot.saved_at = Some(Utc::now());
        }
        self.services.persist(ID, widget.is_dirty(), &snapshot);
    }

    fn toggle_action(self: &Arc<Self>) -> MirrorAction {
        let inner = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(inner) = inner.upgrade() {
                StopwatchController { inner }.toggle();
            }
        })
    }

    fn refresh_mirror(self: &Arc<Self>, widget: &StopwatchWidget) {
        let mirror = &self.services.mirror;
        if mirror.is_open(ID) {
            mirror.update(ID, &mirror_data(widget));
            mirror.update_actions(ID, mirror_actions(widget.is_running(), self.toggle_action()));
        }
    }
}

fn mirror_data(widget: &StopwatchWidget) -> MirrorData {
    MirrorData {
        display: widget.display(),
        running: widget.is_running(),
        stage: None,
    }
}
