//! Chat service
//!
//! Composes the conversation store, the prompt catalog and the engine. Every
//! generation goes through one single-slot gate and a request timeout; the
//! engine is never called concurrently from here. Turns of one session are
//! exchanged one at a time, so each answer lands next to its own question.

pub mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::conversation::{AppendOutcome, ConversationStore};
use crate::inference::{EngineHandle, EngineState, GenerationParams};
use crate::prompts::{PromptStyle, PromptTask};
use crate::types::Role;

pub use error::ChatError;

/// Session used when a caller does not name one
pub const DEFAULT_SESSION: &str = "default";

/// Per-request sampling overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Sampling defaults; stop sequences come from the store's format
    pub defaults: GenerationParams,
    /// Upper bound for `max_tokens`
    pub context_size: u32,
    /// Covers waiting for the gate plus the generation itself
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            defaults: GenerationParams::default(),
            context_size: 2048,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Result of a templated single shot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReply {
    pub prompt: String,
    pub response: String,
}

/// Service status for health checks
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model: Option<String>,
    pub uptime: String,
    pub sessions: usize,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Chat orchestration shared by the HTTP server and the CLI
pub struct ChatService {
    store: Arc<ConversationStore>,
    engine: EngineHandle,
    gate: Arc<Mutex<()>>,
    /// Held from the user append through the assistant append
    turns: DashMap<String, Arc<Mutex<()>>>,
    config: ChatConfig,
    started: Instant,
}

impl ChatService {
    pub fn new(store: Arc<ConversationStore>, engine: EngineHandle, config: ChatConfig) -> Self {
        Self {
            store,
            engine,
            gate: Arc::new(Mutex::new(())),
            turns: DashMap::new(),
            config,
            started: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn params(&self, overrides: Overrides, suggested_temperature: Option<f32>) -> GenerationParams {
        let mut params = GenerationParams {
            stop_sequences: self.store.config().format.stop_sequences(),
            ..self.config.defaults.clone()
        };
        if let Some(t) = suggested_temperature {
            params.temperature = t;
        }
        if let Some(n) = overrides.max_tokens {
            params.max_tokens = n;
        }
        if let Some(t) = overrides.temperature {
            params.temperature = t;
        }
        params.validate(self.config.context_size);
        params
    }

    /// Run one generation under the gate. On timeout the generation keeps
    /// the gate until the engine returns.
    async fn invoke(&self, prompt: String, params: GenerationParams) -> Result<String, ChatError> {
        let engine = self.engine.engine().await?;
        let deadline = tokio::time::Instant::now() + self.config.request_timeout;

        let permit = tokio::time::timeout_at(deadline, Arc::clone(&self.gate).lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!("Timed out waiting for the engine");
                ChatError::Timeout
            })?;

        let started = Instant::now();
        let task = tokio::spawn(async move {
            let _permit = permit;
            engine.generate(&prompt, &params).await
        });

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => {
                tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Generation done");
                result.map_err(ChatError::from)
            }
            Ok(Err(e)) => Err(ChatError::Engine(format!("generation task failed: {e}"))),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.request_timeout.as_secs(),
                    "Generation timed out"
                );
                Err(ChatError::Timeout)
            }
        }
    }

    /// One conversational turn. The user message and the answer (or the
    /// user-facing error) are recorded in the session's history. A second
    /// message for the same session waits until this exchange is recorded.
    pub async fn chat(
        &self,
        session_id: &str,
        message: &str,
        overrides: Overrides,
    ) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::InvalidInput("Message required".to_string()));
        }

        let lock = self.turns.entry(session_id.to_string()).or_default().value().clone();
        let result = {
            let _turn = lock.lock().await;
            self.exchange(session_id, message, overrides).await
        };
        drop(lock);
        // Nobody else holds or waits on it once only the map's copy is left.
        self.turns.remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn exchange(
        &self,
        session_id: &str,
        message: &str,
        overrides: Overrides,
    ) -> Result<String, ChatError> {
        self.store.append(session_id, Role::User, message);
        let prompt = self.store.render(session_id, message);
        tracing::info!(session = session_id, prompt_chars = prompt.len(), "Chat request");

        let result = self.invoke(prompt, self.params(overrides, None)).await;
        let recorded = match &result {
            Ok(response) => Some(response.clone()),
            Err(e) => {
                tracing::error!(session = session_id, kind = e.kind(), "Chat failed: {}", e);
                e.is_recorded().then(|| e.user_message())
            }
        };
        if let Some(content) = recorded {
            if self.store.append(session_id, Role::Assistant, content) == AppendOutcome::DroppedOrphan {
                tracing::warn!(session = session_id, "Session cleared while generating");
            }
        }
        result
    }

    /// Single-shot generation of a raw prompt. Nothing is recorded.
    pub async fn generate(&self, prompt: &str, overrides: Overrides) -> Result<String, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::InvalidInput("Prompt required".to_string()));
        }
        self.invoke(prompt.to_string(), self.params(overrides, None)).await
    }

    /// Render a catalog task and run it as a single shot, using the task's
    /// suggested temperature unless overridden.
    pub async fn run_task(
        &self,
        task: &PromptTask,
        style: PromptStyle,
        overrides: Overrides,
    ) -> Result<TaskReply, ChatError> {
        if task.subject().trim().is_empty() {
            return Err(ChatError::InvalidInput(format!("{} needs text to work on", task.kind())));
        }
        let prompt = task.render_as(style);
        tracing::info!(kind = task.kind(), ?style, "Prompt task");
        let response = self
            .invoke(prompt.clone(), self.params(overrides, Some(task.temperature())))
            .await?;
        Ok(TaskReply { prompt, response })
    }

    pub async fn health(&self) -> Health {
        let (status, model) = match self.engine.state().await {
            EngineState::Ready(engine) => ("healthy", Some(engine.model_info().name)),
            EngineState::Loading => ("loading", None),
            EngineState::Failed(_) => ("unavailable", None),
        };
        Health {
            status,
            model_loaded: model.is_some(),
            model,
            uptime: format_uptime(self.started.elapsed()),
            sessions: self.store.len(),
        }
    }
}

/// `"1h 2m 3s"`
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
