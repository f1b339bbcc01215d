mod config;
pub mod database;
pub mod memory;

pub use config::{AlarmDefaults, Config, TimerDefaults};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

/// Returns `~/.config/reveille[-dev]/` based on REVEILLE_ENV.
///
/// Set REVEILLE_ENV=dev to use a separate development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REVEILLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("reveille-dev")
    } else {
        base_dir.join("reveille")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
