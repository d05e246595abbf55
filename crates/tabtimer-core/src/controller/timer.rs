use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;

use super::{mirror_actions, reset_event, stopped_event, Live, Services, WidgetControl};
use crate::events::Event;
use crate::lock;
use crate::mirror::{MirrorAction, MirrorData, MirrorRequest};
use crate::scheduler::{SchedulerHandle, StartRequest, SubscriptionToken, TickHandler, TickMessage};
use crate::timer::snapshot::gap_ms;
use crate::timer::{
    title_for, CountdownTick, Snapshot, TimeInput, TimerId, TimerSnapshot, TimerWidget,
    WidgetState,
};

const ID: TimerId = TimerId::Timer;

/// What a tick handler sees of the widget. Rebound whenever it changes.
#[derive(Debug, Clone)]
struct TickContext {
    run: u64,
    label: String,
    audio_enabled: bool,
}

impl TickContext {
    fn of(live: &Live<TimerWidget>) -> Self {
        Self {
            run: live.run,
            label: live.widget.label().to_string(),
            audio_enabled: live.widget.audio_enabled(),
        }
    }
}

/// Countdown timer widget.
#[derive(Clone)]
pub struct TimerController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<Live<TimerWidget>>,
    scheduler: SchedulerHandle,
    services: Arc<Services>,
    /// Pending auto-reset after completion.
    alarm_window: Mutex<Option<JoinHandle<()>>>,
}

impl TimerController {
    /// Build the widget from its stored snapshot, or from defaults. A
    /// snapshot saved while running resumes with the time spent away
    /// already taken off.
    pub fn mount(services: Arc<Services>) -> Self {
        let presets = services.store.presets();
        let snapshot = services.store.load::<TimerSnapshot>(ID);
        let widget = match &snapshot {
            Some(s) => TimerWidget::hydrate(s, &presets),
            None => TimerWidget::new(services.config.alarm.enabled_by_default),
        };
        let controller = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Live::new(widget)),
                scheduler: services.scheduler(),
                services,
                alarm_window: Mutex::new(None),
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

    pub fn is_ringing(&self) -> bool {
        lock(&self.inner.state).widget.is_ringing()
    }

    /// Current scheduler binding, if a scheduler is live.
    pub fn token(&self) -> Option<SubscriptionToken> {
        self.inner.scheduler.token(ID)
    }

    pub fn set_input(&self, input: TimeInput) -> bool {
        let mut live = lock(&self.inner.state);
        let accepted = live.widget.set_input(input);
        if accepted {
            self.inner.refresh_mirror(&live.widget);
        }
        accepted
    }

    /// Text-field entry; see [`TimerWidget::enter_fields`].
    pub fn enter_fields(&self, hours: &str, minutes: &str, seconds: &str) -> bool {
        lock(&self.inner.state)
            .widget
            .enter_fields(hours, minutes, seconds)
    }

    /// Select a stored preset by id, or clear the selection. Unknown ids are
    /// ignored.
    pub fn select_preset(&self, id: Option<&str>) -> bool {
        let preset = match id {
            Some(id) => match self.inner.services.store.preset(id) {
                Some(preset) => Some(preset),
                None => {
                    tracing::debug!(id, "unknown preset ignored");
                    return false;
                }
            },
            None => None,
        };
        let mut live = lock(&self.inner.state);
        let accepted = live.widget.select_preset(preset);
        if accepted {
            self.inner.refresh_mirror(&live.widget);
        }
        accepted
    }
}

impl WidgetControl for TimerController {
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
        let active = {
            let live = lock(&self.inner.state);
            live.widget.is_running() || live.widget.is_ringing()
        };
        if active {
            self.inner.stop();
        } else {
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
                title: mirror_title(widget.label()),
                data: mirror_data(widget),
                actions: mirror_actions(widget.is_running(), self.inner.toggle_action()),
            }
        };
        self.inner.services.mirror.toggle(request)
    }

    fn unmount(&self) {
        self.inner.unmount();
    }
}

impl Inner {
    fn resume(self: &Arc<Self>, gap_ms: u64) {
        let secs = i64::try_from(gap_ms / 1000).unwrap_or(i64::MAX);
        let left = lock(&self.state).widget.catch_up(secs);
        if left {
            tracing::debug!(gap_ms, "resuming timer");
            self.start();
        } else {
            tracing::debug!(gap_ms, "timer expired while away");
            self.services.store.clear(ID);
        }
    }

    fn start(self: &Arc<Self>) -> bool {
        let mut live = lock(&self.state);
        let Some(duration) = live.widget.start() else {
            return false;
        };
        live.next_run();
        let ctx = TickContext::of(&live);
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
            tracing::warn!("timer started while its scheduler was still live");
        }
        true
    }

    fn stop(self: &Arc<Self>) -> bool {
        let mut live = lock(&self.state);
        if live.widget.is_ringing() {
            self.cancel_alarm();
            self.reset_locked(&mut live);
            return true;
        }
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

    fn reset(self: &Arc<Self>) {
        self.cancel_alarm();
        let mut live = lock(&self.state);
        self.scheduler.destroy_worker(ID);
        self.reset_locked(&mut live);
    }

    fn reset_locked(&self, live: &mut Live<TimerWidget>) {
        live.widget.reset();
        self.services.release(ID);
        self.services.store.clear(ID);
        self.services.mirror.close(ID);
        self.services.emit(reset_event(ID));
    }

    fn unmount(self: &Arc<Self>) {
        self.cancel_alarm();
        let mut live = lock(&self.state);
        self.scheduler.destroy_worker(ID);
        if live.widget.is_ringing() {
            self.reset_locked(&mut live);
            return;
        }
        // Keep the running flag in the record so the next mount resumes.
        self.persist(&live.widget);
        live.widget.stop();
        self.services.registry.remove_from_running(ID);
        self.services.chrome.set_indicator(ID, false);
        self.services.mirror.close(ID);
    }

    fn handler(self: &Arc<Self>, ctx: TickContext) -> TickHandler {
        let inner = Arc::downgrade(self);
        Box::new(move |tick| {
            if let Some(inner) = inner.upgrade() {
                inner.on_tick(tick, &ctx);
            }
        })
    }

    /// Swap the tick handler for one that sees the current label and alarm
    /// flag. Retries when a restart raced with the swap.
    fn rebind(self: &Arc<Self>) {
        loop {
            let ctx = TickContext::of(&lock(&self.state));
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
            CountdownTick::Ignored => {}
            CountdownTick::Running(display) => {
                self.services
                    .publish_title(ID, title_for(ID, &display, &ctx.label));
                self.services.mirror.update(ID, &mirror_data(&live.widget));
                self.persist(&live.widget);
                self.services.emit(Event::TimerTick {
                    id: ID,
                    display: display.to_string(),
                });
            }
            CountdownTick::Completed => {
                self.scheduler.destroy_worker(ID);
                self.complete(&live.widget, ctx);
            }
        }
    }

    /// Ring, then reset once the alarm window has passed. The timer keeps
    /// its place in the running set until then.
    fn complete(self: &Arc<Self>, widget: &TimerWidget, ctx: &TickContext) {
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
        self.services
            .publish_title(ID, title_for(ID, &widget.display(), &ctx.label));
        self.services.store.clear(ID);
        self.refresh_mirror(widget);

        let window = self.services.config.alarm_window();
        let inner = Arc::downgrade(self);
        let task = self.services.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = inner.upgrade() {
                inner.finish_alarm();
            }
        });
        if let Some(previous) = lock(&self.alarm_window).replace(task) {
            previous.abort();
        }
    }

    fn finish_alarm(&self) {
        // This runs on the window task itself; detach rather than abort.
        drop(lock(&self.alarm_window).take());
        let mut live = lock(&self.state);
        if live.widget.is_ringing() {
            self.reset_locked(&mut live);
        }
    }

    fn cancel_alarm(&self) {
        if let Some(task) = lock(&self.alarm_window).take() {
            task.abort();
        }
    }

    fn persist(&self, widget: &TimerWidget) {
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
                TimerController { inner }.toggle();
            }
        })
    }

    fn refresh_mirror(self: &Arc<Self>, widget: &TimerWidget) {
        let mirror = &self.services.mirror;
        if mirror.is_open(ID) {
            mirror.update(ID, &mirror_data(widget));
            mirror.update_actions(ID, mirror_actions(widget.is_running(), self.toggle_action()));
        }
    }
}

fn mirror_data(widget: &TimerWidget) -> MirrorData {
    MirrorData {
        display: widget.display(),
        running: widget.is_running(),
        stage: None,
    }
}

fn mirror_title(label: &str) -> String {
    if label.is_empty() {
        ID.display_name().to_string()
    } else {
        label.to_string()
    }
}
