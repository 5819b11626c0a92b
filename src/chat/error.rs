//! Chat error taxonomy

use axum::http::StatusCode;
use thiserror::Error;

use crate::inference::EngineError;

/// Failures surfaced by the chat service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Rejected before touching history or the engine
    #[error("{0}")]
    InvalidInput(String),
    /// Engine missing, still loading, or not reachable
    #[error("Model not available: {0}")]
    EngineUnavailable(String),
    /// Engine ran but failed or produced nothing
    #[error("Error generating response: {0}")]
    Engine(String),
    #[error("Request timed out. Please try again.")]
    Timeout,
}

impl ChatError {
    /// Stable machine-readable name
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidInput(_) => "invalid_input",
            ChatError::EngineUnavailable(_) => "engine_unavailable",
            ChatError::Engine(_) => "engine_error",
            ChatError::Timeout => "timeout",
        }
    }

    /// Text shown to the user, and recorded as the assistant turn on the
    /// conversational path.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure belongs in the conversation history
    pub fn is_recorded(&self) -> bool {
        !matches!(self, ChatError::InvalidInput(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChatError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChatError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<EngineError> for ChatError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ModelNotFound(path) => {
                ChatError::EngineUnavailable(format!("model file not found: {path}"))
            }
            EngineError::Load(msg) | EngineError::Unreachable(msg) => {
                ChatError::EngineUnavailable(msg)
            }
            EngineError::Generation(msg) => ChatError::Engine(msg),
            EngineError::EmptyOutput => ChatError::Engine("No response generated".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status() {
        let cases = [
            (ChatError::InvalidInput("x".into()), "invalid_input", 400),
            (ChatError::EngineUnavailable("x".into()), "engine_unavailable", 503),
            (ChatError::Engine("x".into()), "engine_error", 500),
            (ChatError::Timeout, "timeout", 504),
        ];
        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(err.status_code().as_u16(), status);
        }
    }

    #[test]
    fn test_from_engine_error() {
        let loading: ChatError = EngineError::Unreachable("Model loading...".into()).into();
        assert_eq!(loading, ChatError::EngineUnavailable("Model loading...".into()));
        assert_eq!(loading.user_message(), "Model not available: Model loading...");

        let empty: ChatError = EngineError::EmptyOutput.into();
        assert_eq!(empty.user_message(), "Error generating response: No response generated");
    }

    #[test]
    fn test_only_invalid_input_is_unrecorded() {
        assert!(!ChatError::InvalidInput("x".into()).is_recorded());
        assert!(ChatError::Timeout.is_recorded());
        assert_eq!(ChatError::Timeout.user_message(), "Request timed out. Please try again.");
    }
}
