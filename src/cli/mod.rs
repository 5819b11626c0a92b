//! Terminal front end
//!
//! Command parsing for the interactive chat and the loop that drives it.

pub mod commands;
pub mod repl;

pub use commands::{parse_command, parse_task, ReplCommand};
