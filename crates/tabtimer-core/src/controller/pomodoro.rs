use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::{mirror_actions, reset_event, stopped_event, Live, Services, WidgetControl};
use crate::events::Event;
use crate::lock;
use crate::mirror::{MirrorAction, MirrorData, MirrorRequest};
use crate::scheduler::{SchedulerHandle, StartRequest, SubscriptionToken, TickHandler, TickMessage};
use crate::timer::snapshot::gap_ms;
use crate::timer::{
    title_for, PomodoroSnapshot, PomodoroTick, PomodoroWidget, Snapshot, Stage, StageDurations,
    TimerId, WidgetState,
};

const ID: TimerId = TimerId::Pomodoro;

#[derive(Debug, Clone)]
struct TickContext {
    run: u64,
    label: String,
    audio_enabled: bool,
    auto_advance: bool,
}

/// Pomodoro widget: a countdown whose stage advances on every completion.
#[derive(Clone)]
pub struct PomodoroController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<Live<PomodoroWidget>>,
    scheduler: SchedulerHandle,
    services: Arc<Services>,
}

impl PomodoroController {
    pub fn mount(services: Arc<Services>) -> Self {
        let durations = services.config.stage_durations();
        let snapshot = services.store.load::<PomodoroSnapshot>(ID);
        let widget = match &snapshot {
            Some(s) => PomodoroWidget::hydrate(s, durations),
            None => PomodoroWidget::new(durations, services.config.alarm.enabled_by_default),
        };
        let controller = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Live::new(widget)),
                scheduler: services.scheduler(),
                services,
            }),
        };
        if let Some(saved_at) = snapshot.as_ref().and_then(|s| s.resumed_from()) {
            controller.inner.resume(gap_ms(saved_at, Utc::now()));
        }
        controller
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.state).widget.is_running()
    }

    pub fn stage(&self) -> Stage {
        lock(&self.inner.state).widget.stage()
    }

    pub fn token(&self) -> Option<SubscriptionToken> {
        self.inner.scheduler.token(ID)
    }

    /// Jump to `stage` at its full length. A running Pomodoro keeps running
    /// and its scheduler picks up the new countdown in place.
    pub fn select_stage(&self, stage: Stage) {
        let inner = &self.inner;
        let mut live = lock(&inner.state);
        let label = live.widget.label().to_string();
        if let Some(duration) = live.widget.select_stage(stage) {
            inner.scheduler.update_duration(ID, duration);
            inner
                .services
                .publish_title(ID, title_for(ID, &live.widget.display(), &label));
        }
        inner.persist(&live.widget);
        inner.refresh_mirror(&live.widget);
    }

    /// New stage lengths, e.g. after a configuration change.
    pub fn set_durations(&self, durations: StageDurations) {
        let mut live = lock(&self.inner.state);
        live.widget.set_durations(durations);
        self.inner.refresh_mirror(&live.widget);
    }
}

impl WidgetControl for PomodoroController {
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
        {
            let mut live = lock(&self.inner.state);
            live.widget.set_audio_enabled(enabled);
            self.inner.persist(&live.widget);
        }
        self.inner.rebind();
    }

    fn toggle_mirror(&self) -> bool {
        let request = {
            let live = lock(&self.inner.state);
            let widget = &live.widget;
            MirrorRequest {
                name: ID,
                title: if widget.label().is_empty() {
                    widget.stage().label().to_string()
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
    fn context(&self, live: &Live<PomodoroWidget>) -> TickContext {
        TickContext {
            run: live.run,
            label: live.widget.label().to_string(),
            audio_enabled: live.widget.audio_enabled(),
            auto_advance: self.services.config.auto_advance,
        }
    }

    fn resume(self: &Arc<Self>, gap_ms: u64) {
        let secs = i64::try_from(gap_ms / 1000).unwrap_or(i64::MAX);
        let left = {
            let mut live = lock(&self.state);
            let left = live.widget.catch_up(secs);
            if !left {
                self.persist(&live.widget);
            }
            left
        };
        if left {
            tracing::debug!(gap_ms, "resuming pomodoro");
            self.start();
        } else {
            tracing::debug!(gap_ms, "pomodoro stage ran out while away");
        }
    }

    fn start(self: &Arc<Self>) -> bool {
        let mut live = lock(&self.state);
        let Some(duration) = live.widget.start() else {
            return false;
        };
        live.next_run();
        let ctx = self.context(&live);
        self.services.claim(ID);
        self.services
            .publish_title(ID, title_for(ID, &live.widget.display(), &ctx.label));
        self.persist(&live.widget);
        self.refresh_mirror(&live.widget);
        self.services.emit(Event::TimerStarted {
            id: ID,
            from: duration,
            at: Utc::now(),
        });
        let request = StartRequest::countdown(ID, duration);
        if self.scheduler.init_worker(request, self.handler(ctx)).is_none() {
            tracing::warn!("pomodoro started while its scheduler was still live");
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
            let ctx = self.context(&lock(&self.state));
            let run = ctx.run;
            if self.scheduler.rebind(ID, self.handler(ctx)).is_none() {
                return;
            }
            if lock(&self.state).run == run {
                return;
            }
        }
    }

    fn on_tick(self: &Arc<Self>, tick: TickMessage, ctx: &TickContext) {
        let TickMessage::Countdown { duration } = tick else {
            return;
        };
        let mut live = lock(&self.state);
        if live.run != ctx.run {
            return;
        }
        match live.widget.on_tick(duration) {
            PomodoroTick::Ignored => {}
            PomodoroTick::Running(display) => {
                self.services
                    .publish_title(ID, title_for(ID, &display, &ctx.label));
                self.services.mirror.update(ID, &mirror_data(&live.widget));
                self.persist(&live.widget);
                self.services.emit(Event::TimerTick {
                    id: ID,
                    display: display.to_string(),
                });
            }
            PomodoroTick::Completed {
                from,
                to,
                next_duration,
            } => {
                let at = Utc::now();
                self.services.emit(Event::TimerCompleted { id: ID, at });
                if ctx.audio_enabled {
                    self.services.alarm.play(ID);
                }
                self.services.emit(Event::AlarmTriggered {
                    id: ID,
                    audible: ctx.audio_enabled,
                    at,
                });
                self.services.emit(Event::StageAdvanced {
                    from,
                    to,
                    duration_secs: next_duration,
                    at,
                });

                if ctx.auto_advance && next_duration > 0 {
                    // The halted scheduler re-arms with the next stage.
                    self.scheduler.update_duration(ID, next_duration);
                    self.services.publish_title(
                        ID,
                        title_for(ID, &live.widget.display(), &ctx.label),
                    );
                } else {
                    live.widget.park();
                    self.scheduler.destroy_worker(ID);
                    self.services.release(ID);
                }
                self.persist(&live.widget);
                self.refresh_mirror(&live.widget);
            }
        }
    }

    /// Rotation position survives a reload even while idle, so anything
    /// past the first slot is kept.
    fn persist(&self, widget: &PomodoroWidget) {
        let mut snapshot = widget.snapshot();
        if widget.is_running() {
            snapshot.saved_at = Some(Utc::now());
        }
        let keep = widget.is_dirty() || widget.rotation().index() != 0;
        self.services.persist(ID, keep, &snapshot);
    }

    fn toggle_action(self: &Arc<Self>) -> MirrorAction {
        let inner = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(inner) = inner.upgrade() {
                PomodoroController { inner }.toggle();
            }
        })
    }

    fn refresh_mirror(self: &Arc<Self>, widget: &PomodoroWidget) {
        let mirror = &self.services.mirror;
        if mirror.is_open(ID) {
            mirror.update(ID, &mirror_data(widget));
            mirror.update_actions(ID, mirror_actions(widget.is_running(), self.toggle_action()));
        }
    }
}

fn mirror_data(widget: &PomodoroWidget) -> MirrorData {
    MirrorData {
        display: widget.display(),
        running: widget.is_running(),
        stage: Some(widget.stage()),
    }
}
