//! End-to-end tests for a full session.
//!
//! Every test runs on a paused tokio clock, so "sleeping" advances time
//! instantly and tick schedules are exact.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tabtimer_core::mirror::MirrorFrame;
use tabtimer_core::timer::StageDurations;
use tabtimer_core::{
    Config, CoreError, Database, Display, Event, RecordingAlarm, RecordingSurface, Session,
    SnapshotStore, Stage, TimeInput, TimerId, WidgetControl,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    session: Session,
    events: UnboundedReceiver<Event>,
    surface: Arc<RecordingSurface>,
    alarm: Arc<RecordingAlarm>,
}

impl Harness {
    fn drain(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

fn harness_with(config: Config, store: SnapshotStore) -> Harness {
    let surface = Arc::new(RecordingSurface::new());
    let alarm = Arc::new(RecordingAlarm::new());
    let (session, events) = Session::new(config, store, surface.clone(), alarm.clone()).unwrap();
    Harness {
        session,
        events,
        surface,
        alarm,
    }
}

fn harness() -> Harness {
    harness_with(Config::default(), SnapshotStore::in_memory().unwrap())
}

fn short_pomodoro_config() -> Config {
    let mut config = Config::default();
    config.pomodoro.focus_duration = 1;
    config.pomodoro.short_break = 1;
    config.pomodoro.long_break = 1;
    config
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn seconds_ago(secs: i64) -> String {
    (Utc::now() - chrono::Duration::seconds(secs)).to_rfc3339()
}

// ============================================================================
// Timer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_five_second_timer_rings_then_clears_title() {
    let mut h = harness();
    let timer = h.session.timer().clone();
    assert!(timer.set_input(TimeInput::new(0, 0, 5)));
    assert!(timer.start());
    assert_eq!(h.session.chrome().title(), "5 - Timer");
    assert!(h.session.chrome().indicator(TimerId::Timer));

    sleep_ms(5_100).await;
    assert!(timer.is_ringing());
    assert!(!timer.is_running());
    assert_eq!(h.alarm.played(), vec![TimerId::Timer]);
    assert_eq!(h.session.chrome().title(), "0 - Timer");
    // Still owns the title while ringing.
    assert!(h.session.registry().is_last_running_timer(TimerId::Timer));

    let events = h.drain();
    let ticks: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TimerTick { display, .. } => Some(display.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec!["4", "3", "2", "1"]);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::AlarmTriggered {
            id: TimerId::Timer,
            audible: true,
            ..
        }
    )));

    sleep_ms(2_800).await;
    assert!(timer.is_ringing());

    sleep_ms(200).await;
    assert!(!timer.is_ringing());
    assert_eq!(h.session.chrome().title(), "New Tab");
    assert!(h.session.registry().is_empty());
    assert!(!h.session.chrome().indicator(TimerId::Timer));
    assert!(!timer.state().dirty);
    assert!(h.session.store().raw(TimerId::Timer).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_muted_timer_does_not_play() {
    let mut h = harness();
    let timer = h.session.timer().clone();
    timer.set_audio_enabled(false);
    timer.set_input(TimeInput::new(0, 0, 1));
    timer.start();
    sleep_ms(1_100).await;
    assert!(h.alarm.played().is_empty());
    assert!(h.drain().iter().any(|e| matches!(
        e,
        Event::AlarmTriggered { audible: false, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_all_zero_input_does_not_start() {
    let h = harness();
    let timer = h.session.timer().clone();
    assert!(!timer.start());
    assert!(!timer.enter_fields("", "abc", "5"));
    assert!(!timer.start());
    assert!(h.session.registry().is_empty());
    assert!(timer.token().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_overflowing_input_is_normalized_on_start() {
    let h = harness();
    let timer = h.session.timer().clone();
    timer.set_input(TimeInput::new(0, 75, 0));
    assert!(timer.start());
    let state = timer.state();
    assert_eq!(state.duration, Some(4_500));
    assert_eq!(state.display.to_string(), "1:15:00");
}

#[tokio::test(start_paused = true)]
async fn test_stop_drops_late_ticks_and_keeps_state() {
    let mut h = harness();
    let timer = h.session.timer().clone();
    timer.set_input(TimeInput::new(0, 0, 30));
    timer.start();
    sleep_ms(1_500).await;
    assert!(timer.stop());
    h.drain();

    sleep_ms(3_000).await;
    assert!(!h
        .drain()
        .iter()
        .any(|e| matches!(e, Event::TimerTick { .. })));
    let state = timer.state();
    assert_eq!(state.duration, Some(29));
    assert!(state.dirty);
    assert_eq!(h.session.chrome().title(), "New Tab");
    let raw = h.session.store().raw(TimerId::Timer).unwrap();
    assert!(raw.contains("\"duration\":29"));
    assert!(raw.contains("\"running\":false"));

    // Resuming continues from where it stopped.
    assert!(timer.toggle());
    sleep_ms(1_100).await;
    assert_eq!(timer.state().duration, Some(28));
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_alarm_cancels_auto_reset() {
    let mut h = harness();
    let timer = h.session.timer().clone();
    timer.set_input(TimeInput::new(0, 0, 2));
    timer.start();
    sleep_ms(2_100).await;
    assert!(timer.is_ringing());
    timer.reset();
    assert!(!timer.is_ringing());
    assert!(h.session.registry().is_empty());

    // Start again before the old window would have expired.
    timer.set_input(TimeInput::new(0, 0, 10));
    timer.start();
    h.drain();
    sleep_ms(3_000).await;
    assert!(timer.is_running());
    assert!(!h.drain().iter().any(|e| matches!(e, Event::TimerReset { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_preset_pins_reset_target() {
    let store = SnapshotStore::in_memory().unwrap();
    let tea = tabtimer_core::Preset::new("Tea", TimeInput::new(0, 3, 0));
    store.add_preset(tea.clone()).unwrap();
    let h = harness_with(Config::default(), store);
    let timer = h.session.timer().clone();

    assert!(!timer.select_preset(Some("missing")));
    assert!(timer.select_preset(Some(tea.id.as_str())));
    timer.start();
    sleep_ms(2_100).await;
    timer.reset();
    assert_eq!(timer.state().duration, Some(180));
    assert!(!timer.state().dirty);
}

// ============================================================================
// Title arbitration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_last_started_timer_owns_title() {
    let h = harness();
    let timer = h.session.timer().clone();
    let pomodoro = h.session.pomodoro().clone();
    timer.set_input(TimeInput::new(0, 0, 10));
    timer.start();
    sleep_ms(500).await;
    pomodoro.start();
    assert_eq!(h.session.chrome().title(), "25:00 - Pomodoro");

    // Past the pomodoro's first tick at 1.5 s, not on it.
    sleep_ms(1_100).await;
    assert_eq!(h.session.chrome().title(), "24:59 - Pomodoro");
    assert!(h.session.registry().is_last_running_timer(TimerId::Pomodoro));

    pomodoro.stop();
    assert!(h.session.registry().is_last_running_timer(TimerId::Timer));
    assert_eq!(h.session.chrome().title(), "New Tab");

    sleep_ms(1_000).await;
    assert_eq!(h.session.chrome().title(), "8 - Timer");
}

#[tokio::test(start_paused = true)]
async fn test_completion_of_older_timer_leaves_title_alone() {
    let h = harness();
    let timer = h.session.timer().clone();
    timer.set_input(TimeInput::new(0, 0, 3));
    timer.start();
    h.session.pomodoro().start();

    sleep_ms(6_500).await;
    assert!(!timer.is_ringing());
    assert_eq!(h.session.registry().running(), vec![TimerId::Pomodoro]);
    assert_eq!(h.session.chrome().title(), "24:54 - Pomodoro");
}

#[tokio::test(start_paused = true)]
async fn test_label_change_rebinds_running_handler() {
    let h = harness();
    let timer = h.session.timer().clone();
    timer.set_input(TimeInput::new(0, 0, 30));
    timer.start();
    let first = timer.token().unwrap();
    sleep_ms(1_100).await;

    timer.set_label("tea".into());
    let second = timer.token().unwrap();
    assert!(second.version > first.version);

    sleep_ms(1_000).await;
    assert_eq!(h.session.chrome().title(), "28 - tea");
    assert_eq!(timer.state().duration, Some(28));
}

// ============================================================================
// Pomodoro
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_pomodoro_rotation_through_four_completions() {
    let mut h = harness_with(short_pomodoro_config(), SnapshotStore::in_memory().unwrap());
    let pomodoro = h.session.pomodoro().clone();
    assert!(pomodoro.start());

    sleep_ms(4 * 60_000 + 500).await;
    let visited: Vec<Stage> = h
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            Event::StageAdvanced { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        visited,
        vec![Stage::Short, Stage::Focus, Stage::Long, Stage::Focus]
    );
    assert_eq!(h.alarm.played().len(), 4);
    assert!(pomodoro.is_running());
    assert_eq!(pomodoro.stage(), Stage::Focus);
}

#[tokio::test(start_paused = true)]
async fn test_pomodoro_without_auto_advance_parks() {
    let mut config = short_pomodoro_config();
    config.auto_advance = false;
    let h = harness_with(config, SnapshotStore::in_memory().unwrap());
    let pomodoro = h.session.pomodoro().clone();
    pomodoro.start();

    sleep_ms(60_500).await;
    assert!(!pomodoro.is_running());
    assert_eq!(pomodoro.stage(), Stage::Short);
    assert_eq!(pomodoro.state().duration, Some(60));
    assert!(pomodoro.token().is_none());
    assert!(h.session.registry().is_empty());
    // The rotation position is kept for the next mount.
    assert!(h.session.store().raw(TimerId::Pomodoro).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_parked_pomodoro_remounts_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tabtimer.db");
    let mut config = short_pomodoro_config();
    config.auto_advance = false;

    {
        let h = harness_with(
            config.clone(),
            SnapshotStore::new(Database::open_at(&path).unwrap()),
        );
        let pomodoro = h.session.pomodoro().clone();
        pomodoro.start();
        sleep_ms(60_500).await;
        assert_eq!(pomodoro.stage(), Stage::Short);
        assert!(!pomodoro.state().dirty);
        h.session.shutdown();
    }

    let h = harness_with(config, SnapshotStore::new(Database::open_at(&path).unwrap()));
    let pomodoro = h.session.pomodoro().clone();
    assert!(!pomodoro.is_running());
    assert_eq!(pomodoro.stage(), Stage::Short);
    let state = pomodoro.state();
    assert!(!state.dirty);
    assert_eq!(state.duration, Some(60));
}

#[tokio::test(start_paused = true)]
async fn test_select_stage_updates_running_scheduler() {
    let h = harness();
    let pomodoro = h.session.pomodoro().clone();
    pomodoro.start();
    sleep_ms(1_100).await;
    pomodoro.select_stage(Stage::Long);
    assert!(pomodoro.is_running());
    assert_eq!(pomodoro.state().duration, Some(15 * 60));

    sleep_ms(1_000).await;
    assert_eq!(pomodoro.state().duration, Some(15 * 60 - 1));
    assert_eq!(pomodoro.stage(), Stage::Long);
}

#[tokio::test(start_paused = true)]
async fn test_new_durations_apply_to_idle_pomodoro_only() {
    let h = harness();
    let pomodoro = h.session.pomodoro().clone();
    pomodoro.set_durations(StageDurations::from_minutes(50, 10, 30));
    assert_eq!(pomodoro.state().duration, Some(50 * 60));

    pomodoro.start();
    sleep_ms(1_100).await;
    pomodoro.set_durations(StageDurations::default());
    assert_eq!(pomodoro.state().duration, Some(50 * 60 - 1));
}

#[tokio::test(start_paused = true)]
async fn test_pomodoro_resumes_from_minimal_snapshot() {
    let store = SnapshotStore::in_memory().unwrap();
    store.save(
        TimerId::Pomodoro,
        &json!({"duration": 42, "label": "x", "isAudioEnabled": true}),
    );
    let h = harness_with(Config::default(), store);

    let state = h.session.pomodoro().state();
    assert_eq!(state.duration, Some(42));
    assert_eq!(state.label, "x");
    assert!(state.audio_enabled);
    assert!(state.dirty);
    assert!(!state.running);
    assert_eq!(state.display.to_string(), "42");
}

// ============================================================================
// Resume
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_running_timer_resumes_minus_time_away() {
    let store = SnapshotStore::in_memory().unwrap();
    store.save(
        TimerId::Timer,
        &json!({"duration": 100, "running": true, "savedAt": seconds_ago(10)}),
    );
    let h = harness_with(Config::default(), store);
    let timer = h.session.timer().clone();
    assert!(timer.is_running());
    assert_eq!(timer.state().duration, Some(90));
    assert!(h.session.registry().is_running(TimerId::Timer));
}

#[tokio::test(start_paused = true)]
async fn test_timer_that_expired_while_away_mounts_clean() {
    let store = SnapshotStore::in_memory().unwrap();
    store.save(
        TimerId::Timer,
        &json!({"duration": 5, "running": true, "savedAt": seconds_ago(60)}),
    );
    let h = harness_with(Config::default(), store);
    assert!(!h.session.timer().is_running());
    assert!(!h.session.timer().state().dirty);
    assert!(h.session.store().raw(TimerId::Timer).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_running_stopwatch_resumes_with_gap_added() {
    let store = SnapshotStore::in_memory().unwrap();
    store.save(
        TimerId::Stopwatch,
        &json!({"elapsed": 1000, "running": true, "savedAt": seconds_ago(2)}),
    );
    let h = harness_with(Config::default(), store);
    let stopwatch = h.session.stopwatch().clone();
    assert!(stopwatch.is_running());
    let elapsed = stopwatch.elapsed();
    assert!((3_000..3_500).contains(&elapsed), "elapsed {elapsed}");
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_snapshot_mounts_default() {
    let store = SnapshotStore::in_memory().unwrap();
    store.save(TimerId::Stopwatch, &json!({"elapsed": "soon"}));
    let h = harness_with(Config::default(), store);
    let state = h.session.stopwatch().state();
    assert!(!state.dirty);
    assert_eq!(state.elapsed, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_saves_running_state_for_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tabtimer.db");

    {
        let h = harness_with(
            Config::default(),
            SnapshotStore::new(Database::open_at(&path).unwrap()),
        );
        let timer = h.session.timer().clone();
        timer.set_input(TimeInput::new(0, 0, 30));
        timer.start();
        sleep_ms(2_100).await;
        h.session.shutdown();
        assert_eq!(h.session.chrome().title(), "New Tab");
        assert!(timer.token().is_none());
    }

    let h = harness_with(
        Config::default(),
        SnapshotStore::new(Database::open_at(&path).unwrap()),
    );
    let timer = h.session.timer().clone();
    assert!(timer.is_running());
    assert_eq!(timer.state().duration, Some(28));
}

#[tokio::test(start_paused = true)]
async fn test_controller_can_start_again_after_shutdown() {
    let h = harness();
    let timer = h.session.timer().clone();
    let stopwatch = h.session.stopwatch().clone();
    timer.set_input(TimeInput::new(0, 0, 30));
    timer.start();
    stopwatch.start();
    sleep_ms(1_100).await;
    h.session.shutdown();

    assert!(!timer.is_running());
    assert!(!stopwatch.is_running());
    // The saved records still say running.
    assert!(h
        .session
        .store()
        .raw(TimerId::Timer)
        .unwrap()
        .contains("\"running\":true"));

    assert!(timer.start());
    assert!(stopwatch.start());
    assert!(timer.token().is_some());
    assert!(stopwatch.token().is_some());
    sleep_ms(1_100).await;
    assert_eq!(timer.state().duration, Some(28));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_racing_start_and_stop_keep_scheduler_in_step() {
    let h = harness();
    let timer = h.session.timer().clone();
    let stopwatch = h.session.stopwatch().clone();
    timer.set_input(TimeInput::new(0, 10, 0));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    timer.start();
                    stopwatch.start();
                    timer.stop();
                    stopwatch.stop();
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    timer.toggle();
                    stopwatch.toggle();
                }
            });
        }
    });

    assert_eq!(timer.is_running(), timer.token().is_some());
    assert_eq!(stopwatch.is_running(), stopwatch.token().is_some());
    let registry = h.session.registry();
    assert_eq!(timer.is_running(), registry.is_running(TimerId::Timer));
    assert_eq!(stopwatch.is_running(), registry.is_running(TimerId::Stopwatch));

    // Whatever state the race left, a fresh start ticks.
    timer.stop();
    assert!(timer.start());
    let before = timer.state().duration;
    sleep_ms(1_100).await;
    assert_eq!(timer.state().duration, before.map(|d| d - 1));
}

// ============================================================================
// Stopwatch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stopwatch_splits_carry_diffs() {
    let mut h = harness();
    let stopwatch = h.session.stopwatch().clone();
    assert!(stopwatch.split().is_none());
    stopwatch.start();

    sleep_ms(1_505).await;
    let first = stopwatch.split().unwrap();
    sleep_ms(1_000).await;
    let second = stopwatch.split().unwrap();

    assert!(second.elapsed > first.elapsed);
    assert_eq!(
        second.diff_string,
        Display::from_millis(second.elapsed - first.elapsed).to_string()
    );
    assert_eq!(stopwatch.splits(), vec![second.clone(), first]);
    assert_eq!(h.session.chrome().title(), "2 - Stopwatch");

    let recorded = h
        .drain()
        .into_iter()
        .filter(|e| matches!(e, Event::SplitRecorded { .. }))
        .count();
    assert_eq!(recorded, 2);

    stopwatch.stop();
    assert!(stopwatch.state().dirty);
    stopwatch.reset();
    assert!(stopwatch.splits().is_empty());
    assert!(!stopwatch.state().dirty);
}

// ============================================================================
// Mirror
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_mirror_follows_ticks_and_closes_on_reset() {
    let h = harness();
    let timer = h.session.timer().clone();
    let mirror = h.session.mirror();
    timer.set_input(TimeInput::new(0, 0, 30));

    assert!(timer.toggle_mirror());
    assert!(matches!(
        h.surface.frames().first(),
        Some(MirrorFrame::Opened { title, .. }) if title == "Timer"
    ));

    timer.start();
    assert_eq!(mirror.toggle_label(TimerId::Timer).as_deref(), Some("Stop"));
    sleep_ms(1_100).await;
    let shown = h.surface.last_data(TimerId::Timer).unwrap();
    assert_eq!(shown.display, Display::from_secs(29));
    assert!(shown.running);

    // The surface's own button goes through the bound action.
    assert!(mirror.press(TimerId::Timer));
    assert!(!timer.is_running());
    assert_eq!(mirror.toggle_label(TimerId::Timer).as_deref(), Some("Start"));

    timer.reset();
    assert!(!mirror.is_open(TimerId::Timer));
    assert_eq!(
        h.surface.frames().last(),
        Some(&MirrorFrame::Closed {
            name: TimerId::Timer
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabled_mirror_never_opens() {
    let mut config = Config::default();
    config.mirror_enabled = false;
    let h = harness_with(config, SnapshotStore::in_memory().unwrap());
    assert!(!h.session.mirror().is_supported());
    assert!(!h.session.stopwatch().toggle_mirror());
    assert!(h.surface.frames().is_empty());
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_session_requires_runtime() {
    let result = Session::new(
        Config::default(),
        SnapshotStore::in_memory().unwrap(),
        Arc::new(RecordingSurface::new()),
        Arc::new(RecordingAlarm::new()),
    );
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}

#[tokio::test(start_paused = true)]
async fn test_widget_lookup_by_id() {
    let h = harness();
    for id in TimerId::ALL {
        assert_eq!(h.session.widget(id).id(), id);
    }
    assert!(h.session.widget(TimerId::Stopwatch).toggle());
    assert!(h.session.registry().is_running(TimerId::Stopwatch));
}
