//! In-process llama.cpp engine
//!
//! Loads a GGUF checkpoint through `llama-cpp-2` and generates on a blocking
//! thread. A fresh context is created per call, so no KV cache is shared
//! between requests.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;

use crate::inference::engine::{
    finish_output, truncate_at_stop, EngineError, GenerationParams, InferenceEngine,
};
use crate::types::{ModelConfig, ModelInfo};

struct Loaded {
    backend: LlamaBackend,
    model: LlamaModel,
}

/// llama.cpp engine holding one loaded model
pub struct LlamaEngine {
    loaded: Arc<Loaded>,
    /// Held for the whole native generation, even if the caller gave up.
    busy: Arc<Mutex<()>>,
    config: ModelConfig,
    info: ModelInfo,
}

fn generation_error(e: impl std::fmt::Display) -> EngineError {
    EngineError::Generation(e.to_string())
}

impl LlamaEngine {
    /// Load the checkpoint named by `config`. Blocking; can take a while.
    pub fn load(config: &ModelConfig) -> Result<Self, EngineError> {
        let info = ModelInfo::from_path(&config.model_path)
            .ok_or_else(|| EngineError::ModelNotFound(config.model_path.display().to_string()))?;

        tracing::info!(
            path = %config.model_path.display(),
            size_mb = format!("{:.1}", info.size_mb()),
            gpu_layers = config.gpu_layers,
            "Loading model"
        );

        let backend = LlamaBackend::init().map_err(|e| EngineError::Load(e.to_string()))?;
        let model_params = LlamaModelParams::default().with_n_gpu_layers(config.gpu_layers);
        let model = LlamaModel::load_from_file(&backend, &config.model_path, &model_params)
            .map_err(|e| EngineError::Load(e.to_string()))?;

        tracing::info!(model = %info.name, "Model loaded");
        Ok(Self {
            loaded: Arc::new(Loaded { backend, model }),
            busy: Arc::new(Mutex::new(())),
            config: config.clone(),
            info,
        })
    }
}

fn run_generation(
    loaded: &Loaded,
    config: &ModelConfig,
    prompt: &str,
    params: &GenerationParams,
) -> Result<String, EngineError> {
    let model = &loaded.model;
    let ctx_params = LlamaContextParams::default()
        .with_n_ctx(NonZeroU32::new(config.context_size))
        .with_n_batch(config.batch_size)
        .with_n_threads(config.threads as i32);
    let mut ctx = model
        .new_context(&loaded.backend, ctx_params)
        .map_err(generation_error)?;

    let mut tokens = model
        .str_to_token(prompt, AddBos::Always)
        .map_err(generation_error)?;
    // Rendered prompts already carry a literal BOS tag.
    if tokens.len() > 1 && tokens[1] == model.token_bos() {
        tokens.remove(0);
    }

    let n_ctx = ctx.n_ctx() as usize;
    if tokens.is_empty() || tokens.len() >= n_ctx {
        return Err(EngineError::Generation(format!(
            "prompt is {} tokens, context holds {}",
            tokens.len(),
            n_ctx
        )));
    }

    let n_batch = config.batch_size.max(1) as usize;
    let mut batch = LlamaBatch::new(n_batch, 1);
    let last_index = tokens.len() - 1;
    let mut pos: i32 = 0;
    for chunk in tokens.chunks(n_batch) {
        batch.clear();
        for &token in chunk {
            batch
                .add(token, pos, &[0], pos as usize == last_index)
                .map_err(generation_error)?;
            pos += 1;
        }
        ctx.decode(&mut batch).map_err(generation_error)?;
    }

    let mut sampler = if params.temperature <= 0.0 {
        LlamaSampler::greedy()
    } else {
        LlamaSampler::chain_simple([
            LlamaSampler::temp(params.temperature),
            LlamaSampler::dist(params.seed),
        ])
    };

    let mut output: Vec<u8> = Vec::new();
    let mut generated = 0u32;
    while generated < params.max_tokens && (pos as usize) < n_ctx {
        let token = sampler.sample(&ctx, batch.n_tokens() - 1);
        sampler.accept(token);
        if model.is_eog_token(token) {
            break;
        }

        let bytes = model
            .token_to_bytes(token, Special::Tokenize)
            .map_err(generation_error)?;
        output.extend_from_slice(&bytes);
        generated += 1;

        if truncate_at_stop(&String::from_utf8_lossy(&output), &params.stop_sequences).1 {
            break;
        }

        batch.clear();
        batch.add(token, pos, &[0], true).map_err(generation_error)?;
        pos += 1;
        ctx.decode(&mut batch).map_err(generation_error)?;
    }

    tracing::debug!(prompt_tokens = tokens.len(), generated, "Generation finished");
    finish_output(&String::from_utf8_lossy(&output), &params.stop_sequences)
}

#[async_trait]
impl InferenceEngine for LlamaEngine {
    fn model_info(&self) -> ModelInfo {
        self.info.clone()
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError> {
        let loaded = Arc::clone(&self.loaded);
        let busy = Arc::clone(&self.busy);
        let config = self.config.clone();
        let prompt = prompt.to_string();
        let params = params.clone();

        tokio::task::spawn_blocking(move || {
            let _busy = busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            run_generation(&loaded, &config, &prompt, &params)
        })
        .await
        .map_err(|e| EngineError::Generation(format!("generation task failed: {e}")))?
    }
}
