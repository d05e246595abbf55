mod config;
pub mod database;
mod presets;
mod store;

pub use config::{AlarmConfig, Config, EngineConfig, PomodoroConfig};
pub use database::Database;
pub use presets::Preset;
pub use store::SnapshotStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/tabtimer[-dev]/` based on TABTIMER_ENV.
///
/// Set TABTIMER_ENV=dev to use the development data directory, or
/// TABTIMER_DATA_DIR to use an explicit directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TABTIMER_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TABTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tabtimer-dev")
            } else {
                base_dir.join("tabtimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
