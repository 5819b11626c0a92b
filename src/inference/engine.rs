//! Engine abstraction
//!
//! The inference engine is an opaque component that turns a prompt string into
//! generated text. Implementations are not assumed to be safe for concurrent
//! use; callers serialize access (see `chat::ChatService`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::ModelInfo;

/// Parameters for a single generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = greedy)
    pub temperature: f32,
    /// Generation stops before the first occurrence of any of these
    pub stop_sequences: Vec<String>,
    /// Sampler seed
    pub seed: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.2,
            stop_sequences: vec!["</s>".to_string(), "[INST]".to_string()],
            seed: 1234,
        }
    }
}

impl GenerationParams {
    /// Clamp into ranges the engine accepts.
    pub fn validate(&mut self, context_size: u32) {
        self.max_tokens = self.max_tokens.clamp(1, context_size.max(1));
        if !self.temperature.is_finite() {
            self.temperature = 0.2;
        }
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.stop_sequences.retain(|s| !s.is_empty());
    }
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),
    #[error("Failed to load model: {0}")]
    Load(String),
    #[error("Engine not reachable: {0}")]
    Unreachable(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("No response generated")]
    EmptyOutput,
}

impl EngineError {
    /// True when the engine could not be used at all, as opposed to failing
    /// part-way through a generation.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            EngineError::ModelNotFound(_) | EngineError::Load(_) | EngineError::Unreachable(_)
        )
    }
}

/// A loaded inference engine
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Metadata about the model being served
    fn model_info(&self) -> ModelInfo;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError>;
}

/// Cut `text` at the earliest stop sequence, if any.
/// Returns the kept prefix and whether a stop sequence was found.
pub fn truncate_at_stop<'a>(text: &'a str, stop_sequences: &[String]) -> (&'a str, bool) {
    let cut = stop_sequences
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min();
    match cut {
        Some(idx) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Trim an engine's raw output and reject empty results.
pub fn finish_output(raw: &str, stop_sequences: &[String]) -> Result<String, EngineError> {
    let (kept, _) = truncate_at_stop(raw, stop_sequences);
    let text = kept.trim();
    if text.is_empty() {
        Err(EngineError::EmptyOutput)
    } else {
        Ok(text.to_string())
    }
}

/// Load state of the process's engine
#[derive(Clone)]
pub enum EngineState {
    Loading,
    Ready(Arc<dyn InferenceEngine>),
    Failed(String),
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Loading => write!(f, "Loading"),
            EngineState::Ready(engine) => write!(f, "Ready({})", engine.model_info().name),
            EngineState::Failed(e) => write!(f, "Failed({e})"),
        }
    }
}

/// Shared slot holding the engine once it has loaded
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    /// A handle whose engine is still loading
    pub fn loading() -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::Loading)),
        }
    }

    pub fn ready(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::Ready(engine))),
        }
    }

    pub async fn set_ready(&self, engine: Arc<dyn InferenceEngine>) {
        tracing::info!(model = %engine.model_info().name, "Engine ready");
        *self.state.write().await = EngineState::Ready(engine);
    }

    pub async fn set_failed(&self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!("Engine failed to load: {}", error);
        *self.state.write().await = EngineState::Failed(error);
    }

    pub async fn state(&self) -> EngineState {
        self.state.read().await.clone()
    }

    /// The engine, or why it cannot be used.
    pub async fn engine(&self) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        match &*self.state.read().await {
            EngineState::Ready(engine) => Ok(engine.clone()),
            EngineState::Loading => Err(EngineError::Unreachable("Model loading...".to_string())),
            EngineState::Failed(e) => Err(EngineError::Unreachable(e.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl InferenceEngine for Echo {
        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                name: "echo".into(),
                path: "memory".into(),
                size_bytes: 0,
            }
        }

        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, EngineError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn test_truncate_at_earliest_stop() {
        let stops = vec!["</s>".to_string(), "[INST]".to_string()];
        let (kept, hit) = truncate_at_stop("Paris. [INST] next </s>", &stops);
        assert_eq!(kept, "Paris. ");
        assert!(hit);

        let (kept, hit) = truncate_at_stop("no stops here", &stops);
        assert_eq!(kept, "no stops here");
        assert!(!hit);
    }

    #[test]
    fn test_finish_output_rejects_empty() {
        let stops = vec!["</s>".to_string()];
        assert!(matches!(finish_output("   </s>tail", &stops), Err(EngineError::EmptyOutput)));
        assert_eq!(finish_output("  hello </s>", &stops).unwrap(), "hello");
    }

    #[test]
    fn test_params_validate() {
        let mut params = GenerationParams {
            max_tokens: 0,
            temperature: 9.0,
            stop_sequences: vec![String::new(), "[INST]".into()],
            seed: 0,
        };
        params.validate(2048);
        assert_eq!(params.max_tokens, 1);
        assert_eq!(params.temperature, 2.0);
        assert_eq!(params.stop_sequences, vec!["[INST]".to_string()]);

        params.max_tokens = 100_000;
        params.temperature = f32::NAN;
        params.validate(2048);
        assert_eq!(params.max_tokens, 2048);
        assert_eq!(params.temperature, 0.2);
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(EngineError::Unreachable("x".into()).is_unavailable());
        assert!(EngineError::ModelNotFound("x".into()).is_unavailable());
        assert!(!EngineError::Generation("x".into()).is_unavailable());
        assert!(!EngineError::EmptyOutput.is_unavailable());
    }

    #[tokio::test]
    async fn test_handle_transitions() {
        let handle = EngineHandle::loading();
        assert!(matches!(handle.engine().await, Err(EngineError::Unreachable(_))));

        handle.set_ready(Arc::new(Echo)).await;
        let engine = handle.engine().await.unwrap();
        let out = engine.generate("ping", &GenerationParams::default()).await.unwrap();
        assert_eq!(out, "ping");

        handle.set_failed("disk on fire").await;
        match handle.engine().await {
            Err(EngineError::Unreachable(msg)) => assert_eq!(msg, "disk on fire"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
