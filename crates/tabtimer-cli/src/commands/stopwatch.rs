use clap::Subcommand;
use tabtimer_core::TimerId;

use super::run::{self, CliResult, RunArgs};

#[derive(Subcommand)]
pub enum StopwatchAction {
    /// Count up in the foreground. Enter records a split.
    Run {
        #[command(flatten)]
        common: RunArgs,
    },
    /// Print the saved stopwatch as JSON
    Status,
    /// Forget the saved stopwatch and its splits
    Reset,
}

pub fn run(action: StopwatchAction) -> CliResult {
    match action {
        StopwatchAction::Run { common } => run::run_widget(TimerId::Stopwatch, common, |_| Ok(())),
        StopwatchAction::Status => run::status(TimerId::Stopwatch),
        StopwatchAction::Reset => run::reset(TimerId::Stopwatch),
    }
}
