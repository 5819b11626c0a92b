//! llama.cpp server backend
//!
//! Forwards prompts to a running `llama-server` through its `/completion`
//! endpoint. Used when the in-process engine is not compiled in.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::inference::engine::{finish_output, EngineError, GenerationParams, InferenceEngine};
use crate::types::ModelInfo;

/// Default llama.cpp server address
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    stop: &'a [String],
    seed: u32,
    cache_prompt: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

/// Engine backed by a llama.cpp HTTP server
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| EngineError::Load(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server answers its health endpoint.
    pub async fn ping(&self) -> Result<(), EngineError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::Unreachable(format!(
                "{} returned {}",
                url,
                response.status()
            )))
        }
    }
}

#[async_trait]
impl InferenceEngine for HttpEngine {
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "llama-server".to_string(),
            path: self.base_url.clone(),
            size_bytes: 0,
        }
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError> {
        let body = CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            stop: &params.stop_sequences,
            seed: params.seed,
            cache_prompt: true,
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EngineError::Unreachable(e.to_string())
                } else {
                    EngineError::Generation(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Generation(format!("{status}: {text}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Generation(format!("malformed response: {e}")))?;

        tracing::debug!(chars = completion.content.len(), "Completion received");
        finish_output(&completion.content, &params.stop_sequences)
    }
}
