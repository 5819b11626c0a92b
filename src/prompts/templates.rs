//! Structured instruction templates
//!
//! Each template takes its required inputs verbatim plus an optional
//! modifier. Modifiers select one instruction fragment from a fixed set and
//! fall back to the set's default when the name is not recognized.

use serde::{Deserialize, Serialize};

/// Declares a closed set of instruction fragments keyed by a short name.
macro_rules! instruction_set {
    (
        $(#[$meta:meta])*
        $name:ident (default = $default:ident) {
            $( $variant:ident => $key:literal : $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Short name used on the wire and in the CLI
            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $key ),+
                }
            }

            /// Instruction fragment interpolated into the template
            pub fn instruction(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Look up by exact name, falling back to the default.
            pub fn from_name(name: &str) -> Self {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == name)
                    .unwrap_or_default()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::from_name(name)
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self::from_name(&name)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.name().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

instruction_set! {
    /// Depth of an explanation
    ExplainLevel (default = Simple) {
        Simple => "simple": "Explain in simple terms that anyone can understand",
        Detailed => "detailed": "Provide a comprehensive explanation with examples",
        Technical => "technical": "Give a technical explanation with specific details",
    }
}

instruction_set! {
    /// Target length of a creative piece
    WritingLength (default = Short) {
        Short => "short": "Write a brief piece (2-3 paragraphs)",
        Medium => "medium": "Write a medium-length piece (4-6 paragraphs)",
        Long => "long": "Write a longer piece (8-10 paragraphs)",
    }
}

instruction_set! {
    /// Lens applied by a text analysis
    AnalysisKind (default = General) {
        General => "general": "Provide a general analysis of the main points and themes",
        Critical => "critical": "Provide a critical analysis examining strengths and weaknesses",
        Sentiment => "sentiment": "Analyze the sentiment and emotional tone",
        Technical => "technical": "Provide a technical analysis of the content structure",
    }
}

instruction_set! {
    /// Problem-solving strategy
    Approach (default = StepByStep) {
        StepByStep => "step-by-step": "Break down the solution into clear steps",
        Creative => "creative": "Think outside the box and provide innovative solutions",
        Practical => "practical": "Focus on practical, implementable solutions",
        Comprehensive => "comprehensive": "Provide multiple approaches and considerations",
    }
}

instruction_set! {
    /// Target length of a summary
    SummaryLength (default = Brief) {
        Brief => "brief": "Provide a concise summary (1-2 sentences)",
        Detailed => "detailed": "Provide a detailed summary (3-4 sentences)",
        Comprehensive => "comprehensive": "Provide a comprehensive summary (5-6 sentences)",
    }
}

/// Default number of ideas for `brainstorm` and items for `list_items`
pub const DEFAULT_COUNT: u32 = 5;

/// Optional inputs count when non-empty; whitespace is kept as given.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// General question, optionally grounded in a context passage.
pub fn question(text: &str, context: Option<&str>) -> String {
    match present(context) {
        Some(context) => format!(
            "Context: {context}\n\n\
             Question: {text}\n\n\
             Please provide a clear, accurate, and helpful answer."
        ),
        None => format!(
            "Question: {text}\n\n\
             Please provide a clear, accurate, and helpful answer."
        ),
    }
}

pub fn explain(topic: &str, level: impl Into<ExplainLevel>) -> String {
    let level = level.into();
    format!(
        "Please {} about: {topic}\n\n\
         Structure your response with:\n\
         1. Brief overview\n\
         2. Key points\n\
         3. Examples (if applicable)\n\
         4. Summary",
        level.instruction()
    )
}

pub fn generate_code(language: &str, task: &str, requirements: Option<&str>) -> String {
    let requirements = present(requirements)
        .map(|r| format!("\nRequirements: {r}"))
        .unwrap_or_default();
    format!(
        "Write {language} code to {task}.{requirements}\n\n\
         Please provide:\n\
         1. Clean, well-commented code\n\
         2. Brief explanation of the approach\n\
         3. Example usage (if applicable)\n\n\
         Focus on readability and best practices."
    )
}

pub fn creative_write(genre: &str, topic: &str, length: impl Into<WritingLength>) -> String {
    format!(
        "Write a {genre} piece about: {topic}\n\n\
         {}\n\n\
         Make it engaging, creative, and well-structured.",
        length.into().instruction()
    )
}

pub fn analyze(text: &str, kind: impl Into<AnalysisKind>) -> String {
    format!(
        "Analyze the following text:\n\n\
         \"{text}\"\n\n\
         {}\n\n\
         Structure your analysis with:\n\
         1. Main points\n\
         2. Key insights\n\
         3. Conclusion",
        kind.into().instruction()
    )
}

pub fn compare(item1: &str, item2: &str, criteria: Option<&str>) -> String {
    let criteria = present(criteria)
        .map(|c| format!("\nCompare based on: {c}"))
        .unwrap_or_default();
    format!(
        "Compare {item1} and {item2}.{criteria}\n\n\
         Provide a structured comparison with:\n\
         1. Similarities\n\
         2. Differences\n\
         3. Key advantages of each\n\
         4. Overall recommendation (if applicable)"
    )
}

pub fn solve_problem(problem: &str, approach: impl Into<Approach>) -> String {
    format!(
        "Problem: {problem}\n\n\
         {}\n\n\
         Structure your response with:\n\
         1. Problem understanding\n\
         2. Solution approach\n\
         3. Implementation steps\n\
         4. Potential challenges and solutions",
        approach.into().instruction()
    )
}

pub fn summarize(text: &str, length: impl Into<SummaryLength>) -> String {
    format!(
        "Summarize the following text:\n\n\
         \"{text}\"\n\n\
         {}\n\n\
         Focus on the key points and main ideas.",
        length.into().instruction()
    )
}

pub fn follow_instruction(instruction: &str, context: Option<&str>) -> String {
    let context = present(context)
        .map(|c| format!("\nContext: {c}"))
        .unwrap_or_default();
    format!(
        "Instruction: {instruction}{context}\n\n\
         Please follow the instruction precisely and provide a complete response."
    )
}

pub fn brainstorm(topic: &str, idea_count: u32) -> String {
    format!(
        "Brainstorm {idea_count} creative ideas about: {topic}\n\n\
         For each idea, provide:\n\
         1. Brief description\n\
         2. Key benefits\n\
         3. Potential challenges\n\n\
         Think creatively and consider different perspectives."
    )
}
