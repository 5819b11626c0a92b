//! REPL command parsing

use crate::prompts::{PromptTask, DEFAULT_COUNT};

/// Result of parsing one line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Leave the REPL.
    Quit,
    /// Show the command list.
    Help,
    /// Forget this session's history.
    Clear,
    /// Print this session's history.
    History,
    /// Print model and generation settings.
    Settings,
    /// Print the template catalog.
    Templates,
    /// Send a short canned message through the conversational path.
    Test,
    /// Switch templates between the structured and the one-line wording.
    ToggleStyle,
    /// Run a templated single shot.
    Task(PromptTask),
    /// A template command with missing arguments.
    Usage(&'static str),
    /// Plain text for the conversational path.
    Chat(String),
    /// Blank line.
    Empty,
}

pub fn parse_command(input: &str) -> ReplCommand {
    let input = input.trim();
    if input.is_empty() {
        return ReplCommand::Empty;
    }

    match input.to_lowercase().as_str() {
        "quit" | "exit" | "q" => return ReplCommand::Quit,
        "help" => return ReplCommand::Help,
        "clear" => return ReplCommand::Clear,
        "history" => return ReplCommand::History,
        "settings" => return ReplCommand::Settings,
        "templates" => return ReplCommand::Templates,
        "test" => return ReplCommand::Test,
        "simple" => return ReplCommand::ToggleStyle,
        _ => {}
    }

    // A template keyword only counts when followed by an argument.
    if let Some((name, rest)) = input.split_once(char::is_whitespace) {
        if let Some(parsed) = parse_task(name, rest) {
            return match parsed {
                Ok(task) => ReplCommand::Task(task),
                Err(usage) => ReplCommand::Usage(usage),
            };
        }
    }

    ReplCommand::Chat(input.to_string())
}

/// Build a task from a template keyword and its argument text.
///
/// Returns `None` when `name` is not a template keyword, and `Err(usage)`
/// when the arguments do not fit the template.
pub fn parse_task(name: &str, rest: &str) -> Option<Result<PromptTask, &'static str>> {
    let rest = rest.trim();
    let text = rest.to_string();

    let task = match name.to_lowercase().as_str() {
        "question" => PromptTask::Question { text, context: None },
        "explain" => PromptTask::Explain { topic: text, level: Default::default() },
        "code" => match rest.split_once(char::is_whitespace) {
            Some((language, task)) if !task.trim().is_empty() => PromptTask::GenerateCode {
                language: language.to_string(),
                task: task.trim().to_string(),
                requirements: None,
            },
            _ => return Some(Err("Usage: code <language> <task>")),
        },
        "write" => match rest.split_once(char::is_whitespace) {
            Some((genre, topic)) if !topic.trim().is_empty() => PromptTask::CreativeWrite {
                genre: genre.to_string(),
                topic: topic.trim().to_string(),
                length: Default::default(),
            },
            _ => return Some(Err("Usage: write <genre> <topic>")),
        },
        "analyze" => PromptTask::Analyze { text, analysis_type: Default::default() },
        "compare" => match rest.split_once(" vs ") {
            Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => PromptTask::Compare {
                item1: a.trim().to_string(),
                item2: b.trim().to_string(),
                criteria: None,
            },
            _ => return Some(Err("Usage: compare <item1> vs <item2>")),
        },
        "solve" => PromptTask::SolveProblem { problem: text, approach: Default::default() },
        "summarize" => PromptTask::Summarize { text, length: Default::default() },
        "brainstorm" => PromptTask::Brainstorm { topic: text, idea_count: DEFAULT_COUNT },
        "instruct" => PromptTask::FollowInstruction { instruction: text, context: None },
        "define" => PromptTask::Define { term: text },
        "example" => PromptTask::Example { concept: text },
        "tips" => PromptTask::Tips { topic: text },
        "pros-cons" => PromptTask::ProsAndCons { topic: text },
        "how-to" => PromptTask::HowTo { task: text },
        "fact-check" => PromptTask::FactCheck { statement: text },
        "list" => {
            let (count, category) = match rest.split_once(char::is_whitespace) {
                Some((n, category)) => match n.parse::<u32>() {
                    Ok(count) => (count, category.trim()),
                    Err(_) => (DEFAULT_COUNT, rest),
                },
                None => (DEFAULT_COUNT, rest),
            };
            if category.is_empty() || category.parse::<u32>().is_ok() {
                return Some(Err("Usage: list [count] <category>"));
            }
            PromptTask::ListItems { category: category.to_string(), count }
        }
        "why" => PromptTask::Why { question: text },
        "what-if" => PromptTask::WhatIf { scenario: text },
        "steps" => PromptTask::StepByStep { instruction: text },
        "best-practices" => PromptTask::BestPractices { topic: text },
        "mistakes" => PromptTask::CommonMistakes { topic: text },
        _ => return None,
    };
    Some(Ok(task))
}

pub fn help_text() -> String {
    let mut text = String::from(
        "\
Commands:
  quit, exit, q             Exit the chat
  help                      Show this help message
  clear                     Clear conversation history
  history                   Show conversation history
  settings                  Show model settings
  templates                 Show prompt templates
  test                      Send a test message
  simple                    Toggle one-line template wording

Templates (single shot, not remembered):
",
    );
    text.push_str(&templates_text());
    text.push_str("\nAnything else is sent to the assistant with conversation memory.");
    text
}

pub fn templates_text() -> String {
    PromptTask::catalog()
        .iter()
        .map(|(_, usage)| format!("  {usage}\n"))
        .collect()
}
