//! Settings storage
//!
//! Manages persistence of generation and server settings.

use crate::conversation::{InstructionFormat, StoreConfig, DEFAULT_MAX_TURNS, DEFAULT_PREAMBLE};
use crate::inference::{GenerationParams, DEFAULT_ENGINE_URL};
use crate::storage::{get_data_dir, StorageError};
use crate::types::{Backend, ModelConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Sampling temperature for conversational turns (0.0 - 2.0)
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampler seed
    pub seed: u32,
    /// Persona prepended to every conversational prompt
    pub system_prompt: String,
    /// Turns kept per session
    pub max_turns: usize,
    /// Instruction delimiters the model was tuned on
    pub format: InstructionFormat,
    /// Which engine serves generation
    pub backend: Backend,
    /// Model loading parameters for the in-process engine
    pub model: ModelConfig,
    /// llama.cpp server address for the http backend
    pub engine_url: String,
    /// Address the API server binds to
    pub host: String,
    pub port: u16,
    /// Per-request generation timeout
    pub request_timeout_secs: u64,
    /// Sessions idle this long are dropped (0 = never)
    pub session_ttl_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            seed: params.seed,
            system_prompt: DEFAULT_PREAMBLE.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            format: InstructionFormat::default(),
            backend: Backend::default(),
            model: ModelConfig::default(),
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_secs: 120,
            session_ttl_secs: 0,
        }
    }
}

impl AppSettings {
    /// Validate settings values
    ///
    /// Ensures all parameters are within acceptable ranges.
    pub fn validate(&mut self) {
        self.model.validate();
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.max_tokens = self.max_tokens.clamp(1, self.model.context_size);

        if self.max_turns < 2 {
            tracing::warn!("max_turns {} cannot hold a pair, using 2", self.max_turns);
            self.max_turns = 2;
        }
        if self.system_prompt.trim().is_empty() {
            self.system_prompt = DEFAULT_PREAMBLE.to_string();
        }
        self.format.validate();

        if self.engine_url.trim().is_empty() {
            self.engine_url = DEFAULT_ENGINE_URL.to_string();
        }
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 120;
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_turns: self.max_turns,
            preamble: self.system_prompt.clone(),
            format: self.format.clone(),
        }
    }

    /// Sampling defaults; stop sequences follow the instruction format.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop_sequences: self.format.stop_sequences(),
            seed: self.seed,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

/// Get the settings file path
pub fn get_settings_path() -> Result<PathBuf, StorageError> {
    Ok(get_data_dir()?.join("settings.json"))
}

/// Load settings from disk
///
/// Returns default settings if the file doesn't exist or is corrupted
pub fn load_settings() -> AppSettings {
    match get_settings_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            tracing::warn!("Failed to locate settings, using defaults: {}", e);
            AppSettings::default()
        }
    }
}

/// Load settings from a specific file, falling back to defaults
pub fn load_settings_from(path: &Path) -> AppSettings {
    match load_settings_internal(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        }
    }
}

fn load_settings_internal(path: &Path) -> Result<AppSettings, StorageError> {
    if !path.exists() {
        tracing::info!("Settings file not found, using defaults");
        return Ok(AppSettings::default());
    }

    let json = fs::read_to_string(path)?;
    let mut settings: AppSettings = serde_json::from_str(&json)?;
    settings.validate();

    tracing::debug!(path = %path.display(), "Loaded settings from disk");
    Ok(settings)
}

/// Save settings to disk
pub fn save_settings(settings: &AppSettings) -> Result<(), StorageError> {
    save_settings_to(settings, &get_settings_path()?)
}

pub fn save_settings_to(settings: &AppSettings, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;

    tracing::debug!(path = %path.display(), "Saved settings to disk");
    Ok(())
}
