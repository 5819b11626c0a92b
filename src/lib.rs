//! KickGPT Library
//!
//! Prompt templates, bounded conversation memory and a serialized gateway to a
//! local llama.cpp model, exposed through a REST API and a terminal chat.

pub mod chat;
pub mod cli;
pub mod conversation;
pub mod inference;
pub mod prompts;
pub mod server;
pub mod storage;
pub mod types;
