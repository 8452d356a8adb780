mod config;
pub mod database;
pub mod migrations;
pub mod project_store;

pub use config::{AccountConfig, CaptureConfig, Config, EndpointConfig, LogConfig, QueueConfig};
pub use database::{Database, DATABASE_FILE, QUEUE_FILE};
pub use project_store::{AuditEntry, ProjectStore, ProjectSummary};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `TRACKLAB_HOME` wins when set. Otherwise `~/.config/tracklab[-dev]/`
/// depending on `TRACKLAB_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TRACKLAB_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("TRACKLAB_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tracklab-dev")
            } else {
                base_dir.join("tracklab")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
