//! Foreground host for one widget.
//!
//! Builds a session against the on-disk store, starts the widget and prints
//! its events until the user quits. Control keys arrive line by line on stdin.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use clap::Args;
use tabtimer_core::{
    AlarmPlayer, Config, Display, Event, MirrorData, MirrorSurface, Session, SnapshotStore,
    TimerId, UnsupportedSurface,
};
use tokio::sync::mpsc;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Flags every `run` subcommand takes.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Label shown in the title instead of the widget name
    #[arg(long)]
    pub label: Option<String>,
    /// Echo the display in a companion view on stderr
    #[arg(long)]
    pub mirror: bool,
}

/// Rings the terminal bell.
struct BellAlarm;

impl AlarmPlayer for BellAlarm {
    fn play(&self, id: TimerId) {
        let mut out = std::io::stdout();
        let _ = write!(out, "\x07");
        let _ = out.flush();
        tracing::debug!(%id, "bell");
    }
}

/// Companion view on stderr. Prints a line only when the shown text changes,
/// so the stopwatch's 10 ms renders collapse to one line per second.
#[derive(Default)]
struct TerminalMirror {
    shown: Mutex<HashMap<TimerId, String>>,
}

impl TerminalMirror {
    fn show(&self, name: TimerId, data: &MirrorData) {
        let mut text = data.display.whole_seconds();
        if !data.running {
            text.push_str(" (stopped)");
        }
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        if shown.get(&name) != Some(&text) {
            eprintln!("[{name}] {text}");
            shown.insert(name, text);
        }
    }
}

impl MirrorSurface for TerminalMirror {
    fn is_supported(&self) -> bool {
        true
    }

    fn open(&self, name: TimerId, title: &str, data: &MirrorData) {
        eprintln!("[{name}] mirror: {title}");
        self.show(name, data);
    }

    fn render(&self, name: TimerId, data: &MirrorData) {
        self.show(name, data);
    }

    fn close(&self, name: TimerId) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        eprintln!("[{name}] mirror closed");
    }
}

/// Print the persisted snapshot of `id` as JSON, `null` when none exists.
pub fn status(id: TimerId) -> CliResult {
    let store = SnapshotStore::open()?;
    match store.raw(id) {
        Some(raw) => {
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => println!("null"),
    }
    Ok(())
}

pub fn reset(id: TimerId) -> CliResult {
    let store = SnapshotStore::open()?;
    store.clear(id);
    println!("{id} reset");
    Ok(())
}

/// Run widget `id` in the foreground. `setup` prepares the mounted widget
/// before it is started. A widget resumed from the last session keeps
/// running as it was.
pub fn run_widget<F>(id: TimerId, args: RunArgs, setup: F) -> CliResult
where
    F: FnOnce(&Session) -> CliResult,
{
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(host(id, args, setup))
}

async fn host<F>(id: TimerId, args: RunArgs, setup: F) -> CliResult
where
    F: FnOnce(&Session) -> CliResult,
{
    let config = Config::load()?;
    let store = SnapshotStore::open()?;
    let surface: Arc<dyn MirrorSurface> = if args.mirror {
        Arc::new(TerminalMirror::default())
    } else {
        Arc::new(UnsupportedSurface)
    };
    let (session, mut events) = Session::new(config, store, surface, Arc::new(BellAlarm))?;

    let widget = session.widget(id);
    if let Some(label) = args.label {
        widget.set_label(label);
    }
    setup(&session)?;
    if args.mirror && !session.mirror().is_open(id) && !widget.toggle_mirror() {
        eprintln!("mirror disabled in config");
    }
    if !widget.state().running && !widget.start() {
        session.shutdown();
        return Err(format!("{} has nothing to run", id.display_name()).into());
    }

    let enter = if id == TimerId::Stopwatch {
        "split"
    } else {
        "start/stop"
    };
    println!(
        "{} running. enter: {enter}, s: start/stop, r: reset, q: quit",
        id.display_name()
    );

    let mut input = spawn_stdin();
    let mut stdin_open = true;
    let mut view = View::new(id);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if view.show(&event) {
                    break;
                }
            }
            line = input.recv(), if stdin_open => match line.as_deref().map(str::trim) {
                None => stdin_open = false,
                Some("q") => break,
                Some("") if id == TimerId::Stopwatch => {
                    session.stopwatch().split();
                }
                Some("") | Some("s") => {
                    widget.toggle();
                }
                Some("r") => widget.reset(),
                Some(other) => view.line(&format!("unknown command: {other}")),
            },
            _ = &mut ctrl_c => break,
        }
    }

    view.finish();
    session.shutdown();
    Ok(())
}

/// Stdin lines, read on a plain thread so a blocked read never holds up the
/// runtime.
fn spawn_stdin() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Terminal rendering of the session's events.
struct View {
    id: TimerId,
    /// A stopwatch reading is on the current line without a newline.
    inline: bool,
    completed: bool,
}

impl View {
    fn new(id: TimerId) -> Self {
        Self {
            id,
            inline: false,
            completed: false,
        }
    }

    /// Print one event. Returns true once a finished timer has reset itself.
    fn show(&mut self, event: &Event) -> bool {
        match event {
            Event::TimerTick { id, display } if *id == self.id => {
                if self.id == TimerId::Stopwatch {
                    let mut out = std::io::stdout();
                    let _ = write!(out, "\r{display}   ");
                    let _ = out.flush();
                    self.inline = true;
                } else {
                    self.line(display);
                }
            }
            Event::TimerStarted { id, .. } if *id == self.id => self.line("started"),
            Event::TimerStopped { id, .. } if *id == self.id => self.line("stopped"),
            Event::TimerCompleted { id, .. } if *id == self.id => {
                self.completed = true;
                self.line("done");
            }
            Event::StageAdvanced {
                to, duration_secs, ..
            } => {
                let next = format!("next: {} ({})", to.label(), Display::from_secs(*duration_secs));
                self.line(&next);
            }
            Event::SplitRecorded { elapsed, diff, .. } => {
                self.line(&format!("split {elapsed} (+{diff})"));
            }
            Event::TimerReset { id, .. } if *id == self.id => {
                self.line("reset");
                return self.completed && self.id == TimerId::Timer;
            }
            Event::TitleChanged { title } => tracing::debug!(%title, "title"),
            _ => {}
        }
        false
    }

    fn line(&mut self, text: &str) {
        if self.inline {
            println!();
            self.inline = false;
        }
        println!("{text}");
    }

    fn finish(&mut self) {
        if self.inline {
            println!();
            self.inline = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn finished_timer_ends_on_its_reset() {
        let mut view = View::new(TimerId::Timer);
        let reset = Event::TimerReset {
            id: TimerId::Timer,
            at: Utc::now(),
        };
        assert!(!view.show(&reset));
        view.show(&Event::TimerCompleted {
            id: TimerId::Timer,
            at: Utc::now(),
        });
        assert!(view.show(&reset));
    }

    #[test]
    fn pomodoro_keeps_running_after_completion() {
        let mut view = View::new(TimerId::Pomodoro);
        view.show(&Event::TimerCompleted {
            id: TimerId::Pomodoro,
            at: Utc::now(),
        });
        assert!(!view.show(&Event::TimerReset {
            id: TimerId::Pomodoro,
            at: Utc::now(),
        }));
    }
}
