mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, LoggingConfig, RewardsConfig};
pub use database::{Course, Database, StreakUpdate};

use std::path::PathBuf;

/// Returns `~/.config/studyloop[-dev]/` based on STUDYLOOP_ENV.
///
/// Set STUDYLOOP_ENV=dev to use the development data directory, or
/// STUDYLOOP_HOME to put the data directory somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("STUDYLOOP_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYLOOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyloop-dev")
            } else {
                base_dir.join("studyloop")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
