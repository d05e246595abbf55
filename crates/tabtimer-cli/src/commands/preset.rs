use clap::Subcommand;
use tabtimer_core::{Display, Preset, SnapshotStore, TimeInput};

use super::run::CliResult;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List stored presets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a new preset
    Add {
        /// Preset name
        name: String,
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
    },
    /// Remove a preset by id
    Remove {
        /// Preset ID
        id: String,
    },
}

pub fn run(action: PresetAction) -> CliResult {
    let store = SnapshotStore::open()?;

    match action {
        PresetAction::List { json } => {
            let presets = store.presets();
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else if presets.is_empty() {
                println!("No presets.");
            } else {
                for p in &presets {
                    println!("{}  {}  {}", p.id, p.name, Display::from_secs(p.total_secs()));
                }
            }
        }
        PresetAction::Add {
            name,
            hours,
            minutes,
            seconds,
        } => {
            let input = TimeInput::new(hours, minutes, seconds);
            if input.is_zero() {
                return Err("a preset needs a non-zero time".into());
            }
            let preset = Preset::new(name, input);
            store.add_preset(preset.clone())?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Remove { id } => {
            let removed = store.remove_preset(&id)?;
            println!("Preset removed: {}", removed.name);
        }
    }
    Ok(())
}
