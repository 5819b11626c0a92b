//! Shared type definitions
//!
//! This module contains all shared data types used across the application.

pub mod config;
pub mod message;
pub mod model;

pub use config::{Backend, ModelConfig, DEFAULT_MODEL_PATH};
pub use message::{Role, Turn};
pub use model::ModelInfo;
