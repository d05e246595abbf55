use clap::Subcommand;
use tabtimer_core::{TimeInput, TimerId, WidgetControl};

use super::run::{self, CliResult, RunArgs};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Count down in the foreground
    Run {
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
        /// Preset id to load (see `preset list`)
        #[arg(long, conflicts_with_all = ["hours", "minutes", "seconds"])]
        preset: Option<String>,
        /// Do not ring on completion
        #[arg(long)]
        mute: bool,
        #[command(flatten)]
        common: RunArgs,
    },
    /// Print the saved timer as JSON
    Status,
    /// Forget the saved timer
    Reset,
}

pub fn run(action: TimerAction) -> CliResult {
    match action {
        TimerAction::Run {
            hours,
            minutes,
            seconds,
            preset,
            mute,
            common,
        } => {
            let input = TimeInput::new(hours, minutes, seconds);
            run::run_widget(TimerId::Timer, common, move |session| {
                let timer = session.timer();
                if mute {
                    timer.set_audio_enabled(false);
                }
                let fresh = preset.is_some() || !input.is_zero();
                if timer.is_running() {
                    if fresh {
                        eprintln!("timer resumed from the last session; new time ignored");
                    }
                    return Ok(());
                }
                // Without a new time a stopped timer just continues.
                if !fresh {
                    return Ok(());
                }
                if timer.state().dirty {
                    timer.reset();
                }
                match preset {
                    Some(id) => {
                        if !timer.select_preset(Some(id.as_str())) {
                            return Err(format!("unknown preset: {id}").into());
                        }
                    }
                    None => {
                        timer.set_input(input);
                    }
                }
                Ok(())
            })
        }
        TimerAction::Status => run::status(TimerId::Timer),
        TimerAction::Reset => run::reset(TimerId::Timer),
    }
}
