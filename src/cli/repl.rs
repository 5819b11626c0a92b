//! Interactive chat loop

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatService, Overrides};
use crate::prompts::PromptStyle;
use crate::cli::commands::{help_text, parse_command, templates_text, ReplCommand};
use crate::storage::AppSettings;
use crate::types::Turn;

/// Session used by the terminal REPL
pub const CLI_SESSION: &str = "cli";

/// Cut `text` to `max` characters, marking the cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn format_history(turns: &[Turn]) -> String {
    let mut out = format!("Conversation history ({} messages):\n", turns.len());
    for (i, turn) in turns.iter().enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, turn.role, preview(&turn.content, 100)));
    }
    out
}

pub fn format_settings(settings: &AppSettings) -> String {
    format!(
        "Model settings:\n\
         - Backend: {:?}\n\
         - Model: {}\n\
         - Context window: {} tokens\n\
         - Batch size: {}\n\
         - Threads: {}\n\
         - GPU layers: {}\n\
         - Max tokens: {}\n\
         - Temperature: {}\n\
         - Conversation memory: {} turns",
        settings.backend,
        settings.model.model_path.display(),
        settings.model.context_size,
        settings.model.batch_size,
        settings.model.threads,
        settings.model.gpu_layers,
        settings.max_tokens,
        settings.temperature,
        settings.max_turns,
    )
}

fn print_prompt() -> std::io::Result<()> {
    print!("\nYou: ");
    std::io::stdout().flush()
}

/// The other wording, with the line announcing it.
pub fn toggle_style(style: PromptStyle) -> (PromptStyle, &'static str) {
    match style {
        PromptStyle::Structured => (PromptStyle::Simple, "Templates now use one-line prompts."),
        PromptStyle::Simple => (PromptStyle::Structured, "Templates now use structured prompts."),
    }
}

/// Run the REPL on stdin until `quit` or end of input.
pub async fn run(service: &ChatService, settings: &AppSettings, mut style: PromptStyle) -> Result<()> {
    println!("KickGPT chat (with memory)");
    println!("Type 'help' for commands, 'quit' to exit.");
    println!("{}", "-".repeat(50));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("\n{}", help_text()),
            ReplCommand::Templates => println!("\nPrompt templates:\n{}", templates_text()),
            ReplCommand::Settings => println!("\n{}", format_settings(settings)),
            ReplCommand::Clear => {
                service.store().clear(CLI_SESSION);
                println!("Conversation history cleared.");
            }
            ReplCommand::History => {
                println!("\n{}", format_history(&service.store().get(CLI_SESSION)));
            }
            ReplCommand::Usage(usage) => println!("{usage}"),
            ReplCommand::Test => {
                let overrides = Overrides { max_tokens: Some(50), ..Default::default() };
                match service.chat(CLI_SESSION, "Hello, how are you?", overrides).await {
                    Ok(reply) => println!("\nTest response: {reply}"),
                    Err(e) => println!("\nError: {}", e.user_message()),
                }
            }
            ReplCommand::ToggleStyle => {
                let (next, notice) = toggle_style(style);
                style = next;
                println!("{notice}");
            }
            ReplCommand::Task(task) => match service.run_task(&task, style, Overrides::default()).await {
                Ok(reply) => println!("\nAssistant: {}", reply.response),
                Err(e) => println!("\nError: {}", e.user_message()),
            },
            ReplCommand::Chat(message) => {
                match service.chat(CLI_SESSION, &message, Overrides::default()).await {
                    Ok(reply) => println!("\nAssistant: {reply}"),
                    Err(e) => println!("\nAssistant: {}", e.user_message()),
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_history_format() {
        let turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        let text = format_history(&turns);
        assert!(text.starts_with("Conversation history (2 messages)"));
        assert!(text.contains("1. user: hi"));
        assert!(text.contains("2. assistant: hello"));
    }

    #[test]
    fn test_toggle_style() {
        let (style, notice) = toggle_style(PromptStyle::Structured);
        assert_eq!(style, PromptStyle::Simple);
        assert!(notice.contains("one-line"));
        assert_eq!(toggle_style(style).0, PromptStyle::Structured);
    }

    #[test]
    fn test_settings_format() {
        let text = format_settings(&AppSettings::default());
        assert!(text.contains("Context window: 2048 tokens"));
        assert!(text.contains("Conversation memory: 10 turns"));
    }
}
