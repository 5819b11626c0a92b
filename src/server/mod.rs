//! HTTP server
//!
//! REST API plus the single-page chat UI, served by axum.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatService;
use crate::conversation::ConversationStore;

/// The web chat page
pub const CHAT_PAGE: &str = include_str!("../../assets/chat.html");

/// Server configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Drop sessions idle this long; `None` keeps them for the process lifetime
    pub session_ttl: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            session_ttl: None,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/generate", post(handlers::generate))
        .route("/api/chat", post(handlers::chat))
        .route("/api/prompt", post(handlers::prompt))
        .route("/api/clear", post(handlers::clear))
        .route("/api/conversation", get(handlers::conversation))
        .route("/api/templates", get(handlers::templates))
        .route("/api/session", get(handlers::new_session))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns once the listener is up.
pub async fn start(config: ServerConfig, chat: Arc<ChatService>) -> Result<ServerHandle, std::io::Error> {
    let prune = config
        .session_ttl
        .map(|ttl| start_prune_task(Arc::clone(chat.store()), ttl));

    let router = build_router(AppState { chat });
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, "KickGPT server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
        _prune: prune,
    })
}

/// Handle returned by `start()`; keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
    _prune: Option<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    /// Run until the server task exits.
    pub async fn wait(self) {
        self.server.await.ok();
    }
}

/// Periodically drop sessions idle longer than `ttl`.
pub fn start_prune_task(store: Arc<ConversationStore>, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let every = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            store.prune_idle(ttl);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::MockEngine;
    use crate::chat::ChatConfig;
    use crate::inference::EngineHandle;
    use crate::prompts::PromptTask;
    use serde_json::{json, Value};

    async fn start_with(engine: EngineHandle) -> (ServerHandle, String) {
        let chat = Arc::new(ChatService::new(
            Arc::new(ConversationStore::default()),
            engine,
            ChatConfig::default(),
        ));
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            session_ttl: None,
        };
        let handle = start(config, chat).await.unwrap();
        let base = format!("http://127.0.0.1:{}", handle.port);
        (handle, base)
    }

    async fn start_ready(reply: &str) -> (ServerHandle, String) {
        start_with(EngineHandle::ready(Arc::new(MockEngine::replying(reply)))).await
    }

    #[tokio::test]
    async fn test_health_reports_model() {
        let (_handle, base) = start_ready("hi").await;
        let resp = reqwest::get(format!("{base}/api/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["model"], "mock");
    }

    #[tokio::test]
    async fn test_health_while_loading_is_503() {
        let (_handle, base) = start_with(EngineHandle::loading()).await;
        let resp = reqwest::get(format!("{base}/api/health")).await.unwrap();
        assert_eq!(resp.status(), 503);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "loading");
    }

    #[tokio::test]
    async fn test_chat_then_conversation_then_clear() {
        let (_handle, base) = start_ready("Hello there").await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "hi", "session_id": "abc" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["response"], "Hello there");
        assert_eq!(body["conversation"].as_array().unwrap().len(), 2);

        let body: Value = client
            .get(format!("{base}/api/conversation?session_id=abc"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["conversation"][0]["role"], "user");
        assert_eq!(body["conversation"][1]["content"], "Hello there");

        let resp = client
            .post(format!("{base}/api/clear"))
            .json(&json!({ "session_id": "abc" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = client
            .get(format!("{base}/api/conversation?session_id=abc"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body["conversation"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_defaults_session_and_rejects_empty() {
        let (_handle, base) = start_ready("ok").await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_input");

        let body: Value = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "hello" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["session_id"], "default");
    }

    #[tokio::test]
    async fn test_engine_error_is_500_and_recorded() {
        let (_handle, base) = start_with(EngineHandle::ready(Arc::new(MockEngine::failing()))).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": "hello" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "engine_error");
        assert_eq!(body["conversation"][1]["content"], body["response"]);
    }

    #[tokio::test]
    async fn test_generate_and_prompt() {
        let (_handle, base) = start_ready("42").await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{base}/api/generate"))
            .json(&json!({ "prompt": "meaning of life?" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["response"], "42");

        let resp = client
            .post(format!("{base}/api/prompt"))
            .json(&json!({ "kind": "define", "term": "entropy", "max_tokens": 64 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["prompt"], "What is entropy?");
        assert_eq!(body["kind"], "define");

        let resp = client
            .post(format!("{base}/api/prompt"))
            .json(&json!({ "kind": "nonsense" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let body: Value = client
            .post(format!("{base}/api/prompt"))
            .json(&json!({ "kind": "explain", "topic": "entropy", "style": "simple" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["prompt"], "Explain entropy in simple terms.");
    }

    #[tokio::test]
    async fn test_prompt_rejects_malformed_overrides() {
        let engine = Arc::new(MockEngine::replying("ok"));
        let (_handle, base) = start_with(EngineHandle::ready(engine.clone())).await;
        let client = reqwest::Client::new();

        for body in [
            json!({ "kind": "define", "term": "entropy", "temperature": "hot" }),
            json!({ "kind": "define", "term": "entropy", "max_tokens": "many" }),
        ] {
            let resp = client
                .post(format!("{base}/api/prompt"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 400);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["error"], "invalid_input");
        }
        assert_eq!(engine.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_templates_session_and_page() {
        let (_handle, base) = start_ready("ok").await;

        let body: Value = reqwest::get(format!("{base}/api/templates"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), PromptTask::catalog().len());
        assert_eq!(entries[0]["name"], "question");

        let body: Value = reqwest::get(format!("{base}/api/session"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(body["session_id"].as_str().unwrap()).is_ok());

        let page = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert!(page.contains("/api/chat"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (_handle, base) = start_ready("ok").await;
        let resp = reqwest::get(format!("{base}/api/nope")).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_prune_task_drops_idle_sessions() {
        let store = Arc::new(ConversationStore::default());
        store.append("s", crate::types::Role::User, "hi");
        let _task = start_prune_task(Arc::clone(&store), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(store.is_empty());
    }
}
