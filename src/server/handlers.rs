//! Request handlers
//!
//! JSON marshalling only. Every decision lives in `ChatService`.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chat::{ChatError, Overrides, DEFAULT_SESSION};
use crate::prompts::{PromptStyle, PromptTask};
use crate::server::{AppState, CHAT_PAGE};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Fields of a `/api/prompt` body that sit beside the task itself
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PromptOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub style: PromptStyle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionRequest {
    pub session_id: Option<String>,
}

fn session_or_default(session_id: Option<&str>) -> &str {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_SESSION,
    }
}

/// Parse a JSON body; an empty body means all defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("Invalid JSON body: {e}")))
}

fn bad_request(message: String) -> Response {
    error_response(&ChatError::InvalidInput(message), None)
}

fn error_response(err: &ChatError, conversation: Option<Value>) -> Response {
    let mut body = json!({
        "success": false,
        "response": err.user_message(),
        "error": err.kind(),
    });
    if let Some(conversation) = conversation {
        body["conversation"] = conversation;
    }
    (err.status_code(), Json(body)).into_response()
}

pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

pub async fn health(State(state): State<AppState>) -> Response {
    let health = state.chat.health().await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

pub async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    let request: GenerateRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let overrides = Overrides {
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };

    match state.chat.generate(&request.prompt, overrides).await {
        Ok(response) => Json(json!({ "success": true, "response": response, "error": null })).into_response(),
        Err(e) => error_response(&e, None),
    }
}

pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ChatRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let session_id = session_or_default(request.session_id.as_deref());
    let overrides = Overrides {
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };

    let result = state.chat.chat(session_id, &request.message, overrides).await;
    let conversation = json!(state.chat.store().get(session_id));
    match result {
        Ok(response) => Json(json!({
            "success": true,
            "response": response,
            "error": null,
            "session_id": session_id,
            "conversation": conversation,
        }))
        .into_response(),
        Err(e) => error_response(&e, Some(conversation)),
    }
}

pub async fn prompt(State(state): State<AppState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid JSON body: {e}")),
    };
    let task: PromptTask = match serde_json::from_value(value.clone()) {
        Ok(task) => task,
        Err(e) => return bad_request(format!("Invalid prompt task: {e}")),
    };
    let options: PromptOptions = match serde_json::from_value(value) {
        Ok(options) => options,
        Err(e) => return bad_request(format!("Invalid prompt options: {e}")),
    };
    let overrides = Overrides {
        max_tokens: options.max_tokens,
        temperature: options.temperature,
    };

    match state.chat.run_task(&task, options.style, overrides).await {
        Ok(reply) => Json(json!({
            "success": true,
            "kind": task.kind(),
            "prompt": reply.prompt,
            "response": reply.response,
            "error": null,
        }))
        .into_response(),
        Err(e) => error_response(&e, None),
    }
}

pub async fn clear(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SessionRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let session_id = session_or_default(request.session_id.as_deref());
    state.chat.store().clear(session_id);
    Json(json!({ "success": true, "message": "Conversation cleared" })).into_response()
}

pub async fn conversation(
    State(state): State<AppState>,
    Query(query): Query<SessionRequest>,
) -> Json<Value> {
    let session_id = session_or_default(query.session_id.as_deref());
    Json(json!({
        "success": true,
        "session_id": session_id,
        "conversation": state.chat.store().get(session_id),
    }))
}

pub async fn templates() -> Json<Value> {
    let entries: Vec<Value> = PromptTask::catalog()
        .iter()
        .map(|(name, usage)| json!({ "name": name, "usage": usage }))
        .collect();
    Json(Value::Array(entries))
}

pub async fn new_session() -> Json<Value> {
    Json(json!({ "session_id": uuid::Uuid::new_v4().to_string() }))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Endpoint not found",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        assert_eq!(session_or_default(None), "default");
        assert_eq!(session_or_default(Some("  ")), "default");
        assert_eq!(session_or_default(Some(" abc ")), "abc");
    }

    #[test]
    fn test_empty_body_parses_to_defaults() {
        let request: ChatRequest = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(request.message.is_empty());
        assert!(request.session_id.is_none());

        assert!(parse_body::<ChatRequest>(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn test_prompt_options_beside_task_fields() {
        let options: PromptOptions = serde_json::from_value(
            json!({ "kind": "define", "term": "x", "temperature": 0.5, "style": "simple" }),
        )
        .unwrap();
        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(options.style, PromptStyle::Simple);

        assert!(serde_json::from_value::<PromptOptions>(json!({ "max_tokens": -3 })).is_err());
    }
}
