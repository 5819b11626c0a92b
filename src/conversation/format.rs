//! Instruction delimiters and the system preamble
//!
//! The tag strings must match what the model was instruction-tuned on. They
//! are configuration, not a parsed format: user content is never escaped.

use serde::{Deserialize, Serialize};

/// Persona text prepended to every conversational prompt
pub const DEFAULT_PREAMBLE: &str = "You are a highly capable and reliable AI assistant. \
Your responses are clear, concise, factual, and grounded in verified knowledge. \
When uncertain, you say so transparently. You avoid speculation, repetition, and hallucination. \
Maintain a friendly, professional tone, and support helpful, accurate, and engaging conversation \
across a wide range of topics.";

/// Delimiters marking instruction boundaries in a rendered prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionFormat {
    /// Beginning-of-sequence marker, emitted once
    pub bos: String,
    /// Opens an instruction segment
    pub open: String,
    /// Closes an instruction segment
    pub close: String,
    /// End-of-sequence marker the model emits after an answer
    pub eos: String,
}

impl Default for InstructionFormat {
    /// Mistral instruct tags
    fn default() -> Self {
        Self {
            bos: "<s>".to_string(),
            open: "[INST]".to_string(),
            close: "[/INST]".to_string(),
            eos: "</s>".to_string(),
        }
    }
}

impl InstructionFormat {
    /// Stop sequences that end generation at the next turn boundary
    pub fn stop_sequences(&self) -> Vec<String> {
        [&self.eos, &self.open]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    }

    /// `"{open} {text} {close}"`
    pub fn instruction(&self, text: &str) -> String {
        format!("{} {} {}", self.open, text, self.close)
    }

    /// Reset blank tags to the defaults.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        if self.open.trim().is_empty() {
            self.open = defaults.open;
        }
        if self.close.trim().is_empty() {
            self.close = defaults.close;
        }
    }
}
