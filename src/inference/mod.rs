//! LLM inference
//!
//! The engine seam plus its two backends: in-process llama.cpp (feature
//! `llama`) and a llama.cpp server reached over HTTP.

pub mod engine;
pub mod http;
#[cfg(feature = "llama")]
pub mod llama;

use std::sync::Arc;

pub use engine::{
    finish_output, truncate_at_stop, EngineError, EngineHandle, EngineState, GenerationParams,
    InferenceEngine,
};
pub use http::{HttpEngine, DEFAULT_ENGINE_URL};
#[cfg(feature = "llama")]
pub use llama::LlamaEngine;

use crate::types::{Backend, ModelConfig};

/// Build the configured engine. Loading a local model blocks, so it runs on
/// the blocking pool.
pub async fn load_engine(
    backend: Backend,
    model: &ModelConfig,
    engine_url: &str,
) -> Result<Arc<dyn InferenceEngine>, EngineError> {
    match backend {
        Backend::Http => {
            let engine = HttpEngine::new(engine_url)?;
            if let Err(e) = engine.ping().await {
                // The server may come up later; generation reports it per call.
                tracing::warn!("llama.cpp server not answering yet: {}", e);
            }
            tracing::info!(url = engine.base_url(), "Using llama.cpp server backend");
            Ok(Arc::new(engine))
        }
        Backend::Llama => load_local(model).await,
    }
}

#[cfg(feature = "llama")]
async fn load_local(model: &ModelConfig) -> Result<Arc<dyn InferenceEngine>, EngineError> {
    let config = model.clone();
    let engine = tokio::task::spawn_blocking(move || LlamaEngine::load(&config))
        .await
        .map_err(|e| EngineError::Load(format!("loader task failed: {e}")))??;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "llama"))]
async fn load_local(model: &ModelConfig) -> Result<Arc<dyn InferenceEngine>, EngineError> {
    if !model.model_path.is_file() {
        return Err(EngineError::ModelNotFound(model.model_path.display().to_string()));
    }
    Err(EngineError::Load(
        "built without the `llama` feature; use the http backend".to_string(),
    ))
}
