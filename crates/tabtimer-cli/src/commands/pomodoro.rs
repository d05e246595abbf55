use clap::Subcommand;
use tabtimer_core::{Stage, TimerId, WidgetControl};

use super::run::{self, CliResult, RunArgs};

#[derive(Subcommand)]
pub enum PomodoroAction {
    /// Run the focus/break rotation in the foreground
    Run {
        /// Stage to begin with: focus, short or long
        #[arg(long)]
        stage: Option<Stage>,
        /// Do not ring between stages
        #[arg(long)]
        mute: bool,
        #[command(flatten)]
        common: RunArgs,
    },
    /// Print the saved pomodoro as JSON
    Status,
    /// Forget the saved pomodoro, including its rotation position
    Reset,
}

pub fn run(action: PomodoroAction) -> CliResult {
    match action {
        PomodoroAction::Run {
            stage,
            mute,
            common,
        } => run::run_widget(TimerId::Pomodoro, common, move |session| {
            let pomodoro = session.pomodoro();
            if mute {
                pomodoro.set_audio_enabled(false);
            }
            if let Some(stage) = stage {
                pomodoro.select_stage(stage);
            }
            Ok(())
        }),
        PomodoroAction::Status => run::status(TimerId::Pomodoro),
        PomodoroAction::Reset => run::reset(TimerId::Pomodoro),
    }
}
