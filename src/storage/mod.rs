//! Persistent storage
//!
//! Only settings are persisted. Conversations live in memory.

pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use settings::{load_settings, load_settings_from, save_settings, save_settings_to, AppSettings};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No home directory found for this platform")]
    NoDataDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Platform data directory, e.g. `~/.local/share/kickgpt` on Linux
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    directories::ProjectDirs::from("com", "KickGPT", "kickgpt")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}
