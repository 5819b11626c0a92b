//! Prompt formatting
//!
//! Stateless construction of instruction text for a fixed catalog of task
//! kinds. [`PromptTask`] is the closed set of tasks; it can be built from JSON
//! (tagged by `kind`) or from CLI arguments, and always renders to the same
//! text for the same inputs.

pub mod simple;
pub mod templates;

use serde::{Deserialize, Serialize};

pub use simple::{
    best_practices, common_mistakes, define, example, fact_check, how_to, list_items,
    pros_and_cons, step_by_step, tips, what_if, why,
};
pub use templates::{
    analyze, brainstorm, compare, creative_write, explain, follow_instruction, generate_code,
    question, solve_problem, summarize, AnalysisKind, Approach, ExplainLevel, SummaryLength,
    WritingLength, DEFAULT_COUNT,
};

fn default_count() -> u32 {
    DEFAULT_COUNT
}

/// How a task is worded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Multi-line template with an explicit response structure
    #[default]
    Structured,
    /// One-line form; modifiers such as level or criteria are dropped
    Simple,
}

/// One templated, single-shot request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptTask {
    Question {
        text: String,
        #[serde(default)]
        context: Option<String>,
    },
    Explain {
        topic: String,
        #[serde(default)]
        level: ExplainLevel,
    },
    GenerateCode {
        language: String,
        task: String,
        #[serde(default)]
        requirements: Option<String>,
    },
    CreativeWrite {
        genre: String,
        topic: String,
        #[serde(default)]
        length: WritingLength,
    },
    Analyze {
        text: String,
        #[serde(default)]
        analysis_type: AnalysisKind,
    },
    Compare {
        item1: String,
        item2: String,
        #[serde(default)]
        criteria: Option<String>,
    },
    SolveProblem {
        problem: String,
        #[serde(default)]
        approach: Approach,
    },
    Summarize {
        text: String,
        #[serde(default)]
        length: SummaryLength,
    },
    Brainstorm {
        topic: String,
        #[serde(default = "default_count")]
        idea_count: u32,
    },
    FollowInstruction {
        instruction: String,
        #[serde(default)]
        context: Option<String>,
    },
    Define { term: String },
    Example { concept: String },
    Tips { topic: String },
    ProsAndCons { topic: String },
    HowTo { task: String },
    FactCheck { statement: String },
    ListItems {
        category: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Why { question: String },
    WhatIf { scenario: String },
    StepByStep { instruction: String },
    BestPractices { topic: String },
    CommonMistakes { topic: String },
}

/// `(kind, usage)` for every task, in catalog order.
pub const CATALOG: &[(&str, &str)] = &[
    ("question", "question <text> - ask a general question"),
    ("explain", "explain <topic> - get an explanation"),
    ("generate_code", "code <language> <task> - generate code"),
    ("creative_write", "write <genre> <topic> - creative writing"),
    ("analyze", "analyze <text> - analyze a text"),
    ("compare", "compare <item1> vs <item2> - compare two things"),
    ("solve_problem", "solve <problem> - work through a problem"),
    ("summarize", "summarize <text> - summarize a text"),
    ("brainstorm", "brainstorm <topic> - brainstorm ideas"),
    ("follow_instruction", "instruct <instruction> - follow an instruction"),
    ("define", "define <term> - define a term"),
    ("example", "example <concept> - give an example"),
    ("tips", "tips <topic> - give tips"),
    ("pros_and_cons", "pros-cons <topic> - list pros and cons"),
    ("how_to", "how-to <task> - explain how to do something"),
    ("fact_check", "fact-check <statement> - check a statement"),
    ("list_items", "list [count] <category> - list items"),
    ("why", "why <question> - ask why"),
    ("what_if", "what-if <scenario> - explore a scenario"),
    ("step_by_step", "steps <instruction> - follow steps"),
    ("best_practices", "best-practices <topic> - best practices"),
    ("common_mistakes", "mistakes <topic> - common mistakes"),
];

impl PromptTask {
    /// Render the instruction text. Pure and deterministic.
    pub fn render(&self) -> String {
        match self {
            PromptTask::Question { text, context } => question(text, context.as_deref()),
            PromptTask::Explain { topic, level } => explain(topic, *level),
            PromptTask::GenerateCode { language, task, requirements } => {
                generate_code(language, task, requirements.as_deref())
            }
            PromptTask::CreativeWrite { genre, topic, length } => {
                creative_write(genre, topic, *length)
            }
            PromptTask::Analyze { text, analysis_type } => analyze(text, *analysis_type),
            PromptTask::Compare { item1, item2, criteria } => {
                compare(item1, item2, criteria.as_deref())
            }
            PromptTask::SolveProblem { problem, approach } => solve_problem(problem, *approach),
            PromptTask::Summarize { text, length } => summarize(text, *length),
            PromptTask::Brainstorm { topic, idea_count } => brainstorm(topic, *idea_count),
            PromptTask::FollowInstruction { instruction, context } => {
                follow_instruction(instruction, context.as_deref())
            }
            PromptTask::Define { term } => define(term),
            PromptTask::Example { concept } => example(concept),
            PromptTask::Tips { topic } => tips(topic),
            PromptTask::ProsAndCons { topic } => pros_and_cons(topic),
            PromptTask::HowTo { task } => how_to(task),
            PromptTask::FactCheck { statement } => fact_check(statement),
            PromptTask::ListItems { category, count } => list_items(category, *count),
            PromptTask::Why { question } => why(question),
            PromptTask::WhatIf { scenario } => what_if(scenario),
            PromptTask::StepByStep { instruction } => step_by_step(instruction),
            PromptTask::BestPractices { topic } => best_practices(topic),
            PromptTask::CommonMistakes { topic } => common_mistakes(topic),
        }
    }

    /// Render in the given style. Kinds without a terse form, such as the
    /// one-liners themselves, render the same in both styles.
    pub fn render_as(&self, style: PromptStyle) -> String {
        if style == PromptStyle::Structured {
            return self.render();
        }
        match self {
            PromptTask::Question { text, .. } => simple::question(text),
            PromptTask::Explain { topic, .. } => simple::explain(topic),
            PromptTask::GenerateCode { language, task, .. } => simple::code(language, task),
            PromptTask::CreativeWrite { genre, topic, .. } => simple::write(genre, topic),
            PromptTask::Analyze { text, .. } => simple::analyze(text),
            PromptTask::Compare { item1, item2, .. } => simple::compare(item1, item2),
            PromptTask::SolveProblem { problem, .. } => simple::solve(problem),
            PromptTask::Summarize { text, .. } => simple::summarize(text),
            PromptTask::Brainstorm { topic, idea_count } => simple::brainstorm(topic, *idea_count),
            _ => self.render(),
        }
    }

    /// The `kind` tag of this task
    pub fn kind(&self) -> &'static str {
        match self {
            PromptTask::Question { .. } => "question",
            PromptTask::Explain { .. } => "explain",
            PromptTask::GenerateCode { .. } => "generate_code",
            PromptTask::CreativeWrite { .. } => "creative_write",
            PromptTask::Analyze { .. } => "analyze",
            PromptTask::Compare { .. } => "compare",
            PromptTask::SolveProblem { .. } => "solve_problem",
            PromptTask::Summarize { .. } => "summarize",
            PromptTask::Brainstorm { .. } => "brainstorm",
            PromptTask::FollowInstruction { .. } => "follow_instruction",
            PromptTask::Define { .. } => "define",
            PromptTask::Example { .. } => "example",
            PromptTask::Tips { .. } => "tips",
            PromptTask::ProsAndCons { .. } => "pros_and_cons",
            PromptTask::HowTo { .. } => "how_to",
            PromptTask::FactCheck { .. } => "fact_check",
            PromptTask::ListItems { .. } => "list_items",
            PromptTask::Why { .. } => "why",
            PromptTask::WhatIf { .. } => "what_if",
            PromptTask::StepByStep { .. } => "step_by_step",
            PromptTask::BestPractices { .. } => "best_practices",
            PromptTask::CommonMistakes { .. } => "common_mistakes",
        }
    }

    /// Suggested sampling temperature for this kind of task
    pub fn temperature(&self) -> f32 {
        match self {
            PromptTask::CreativeWrite { .. } => 0.7,
            PromptTask::Brainstorm { .. } => 0.8,
            PromptTask::Question { .. }
            | PromptTask::GenerateCode { .. }
            | PromptTask::Summarize { .. }
            | PromptTask::Define { .. }
            | PromptTask::FactCheck { .. } => 0.2,
            _ => 0.3,
        }
    }

    /// The primary free-text input, used to reject empty requests.
    pub fn subject(&self) -> &str {
        match self {
            PromptTask::Question { text, .. }
            | PromptTask::Analyze { text, .. }
            | PromptTask::Summarize { text, .. } => text,
            PromptTask::Explain { topic, .. }
            | PromptTask::CreativeWrite { topic, .. }
            | PromptTask::Brainstorm { topic, .. }
            | PromptTask::Tips { topic }
            | PromptTask::ProsAndCons { topic }
            | PromptTask::BestPractices { topic }
            | PromptTask::CommonMistakes { topic } => topic,
            PromptTask::GenerateCode { task, .. } | PromptTask::HowTo { task } => task,
            PromptTask::Compare { item1, item2, .. } => {
                if item1.trim().is_empty() {
                    item1
                } else {
                    item2
                }
            }
            PromptTask::SolveProblem { problem, .. } => problem,
            PromptTask::FollowInstruction { instruction, .. }
            | PromptTask::StepByStep { instruction } => instruction,
            PromptTask::Define { term } => term,
            PromptTask::Example { concept } => concept,
            PromptTask::FactCheck { statement } => statement,
            PromptTask::ListItems { category, .. } => category,
            PromptTask::Why { question } => question,
            PromptTask::WhatIf { scenario } => scenario,
        }
    }

    /// The task catalog, for help output and the templates endpoint
    pub fn catalog() -> &'static [(&'static str, &'static str)] {
        CATALOG
    }
}
