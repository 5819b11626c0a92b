//! Model types
//!
//! Defines model metadata reported by the engines.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Information about a loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Display name of the model
    pub name: String,
    /// Path to the GGUF file, or the server URL for remote engines
    pub path: String,
    /// Model size in bytes (0 when unknown)
    pub size_bytes: u64,
}

impl ModelInfo {
    /// Describe a checkpoint on disk. Returns `None` when the file is missing.
    pub fn from_path(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        Some(Self {
            name,
            path: path.display().to_string(),
            size_bytes: meta.len(),
        })
    }

    /// Size in mebibytes, for display
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
