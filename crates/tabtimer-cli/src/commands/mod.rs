pub mod config;
pub mod pomodoro;
pub mod preset;
pub mod run;
pub mod stopwatch;
pub mod timer;
