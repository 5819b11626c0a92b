//! Configuration types
//!
//! Model loading configuration shared by the engines and settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default quantized checkpoint location, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "models/mistral-7b-v0.1.Q4_K_M.gguf";

/// Which inference backend serves generation calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process llama.cpp (requires the `llama` feature)
    Llama,
    /// A llama.cpp server reached over HTTP
    Http,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "llama") {
            Backend::Llama
        } else {
            Backend::Http
        }
    }
}

/// Model loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the GGUF file
    pub model_path: PathBuf,
    /// Context window size in tokens
    pub context_size: u32,
    /// Prompt evaluation batch size
    pub batch_size: u32,
    /// CPU threads for layers not offloaded to the GPU
    pub threads: u32,
    /// Number of GPU layers to offload (0 = CPU only)
    pub gpu_layers: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            context_size: 2048,
            batch_size: 256,
            threads: 4,
            gpu_layers: 99,
        }
    }
}

impl ModelConfig {
    /// Clamp values into ranges llama.cpp accepts.
    pub fn validate(&mut self) {
        self.context_size = self.context_size.clamp(512, 131072);
        self.batch_size = self.batch_size.clamp(32, self.context_size);
        if self.threads == 0 {
            self.threads = 4;
        }
    }
}
