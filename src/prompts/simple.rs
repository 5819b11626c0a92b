//! One-line instruction forms
//!
//! Short prompts that work well with small instruct models. Inputs are
//! interpolated verbatim. The first group are the terse counterparts of the
//! structured templates, used when a task is rendered in
//! [`PromptStyle::Simple`](super::PromptStyle::Simple).

pub fn question(text: &str) -> String {
    format!("Answer this question: {text}")
}

pub fn explain(topic: &str) -> String {
    format!("Explain {topic} in simple terms.")
}

pub fn code(language: &str, task: &str) -> String {
    format!("Write {language} code to {task}. Include comments.")
}

pub fn write(genre: &str, topic: &str) -> String {
    format!("Write a {genre} story about {topic}.")
}

pub fn analyze(text: &str) -> String {
    format!("Analyze this text: {text}")
}

pub fn compare(item1: &str, item2: &str) -> String {
    format!("Compare {item1} and {item2}.")
}

pub fn solve(problem: &str) -> String {
    format!("Solve this problem: {problem}")
}

pub fn summarize(text: &str) -> String {
    format!("Summarize this: {text}")
}

pub fn brainstorm(topic: &str, idea_count: u32) -> String {
    format!("Give me {idea_count} creative ideas about {topic}.")
}

pub fn define(term: &str) -> String {
    format!("What is {term}?")
}

pub fn example(concept: &str) -> String {
    format!("Give me an example of {concept}.")
}

pub fn tips(topic: &str) -> String {
    format!("Give me tips for {topic}.")
}

pub fn pros_and_cons(topic: &str) -> String {
    format!("What are the pros and cons of {topic}?")
}

pub fn how_to(task: &str) -> String {
    format!("How to {task}?")
}

pub fn fact_check(statement: &str) -> String {
    format!("Is this true? {statement}")
}

pub fn list_items(category: &str, count: u32) -> String {
    format!("List {count} {category}.")
}

pub fn why(question: &str) -> String {
    format!("Why {question}?")
}

pub fn what_if(scenario: &str) -> String {
    format!("What if {scenario}?")
}

pub fn step_by_step(instruction: &str) -> String {
    format!("Follow these steps: {instruction}")
}

pub fn best_practices(topic: &str) -> String {
    format!("What are the best practices for {topic}?")
}

pub fn common_mistakes(topic: &str) -> String {
    format!("What are common mistakes when {topic}?")
}
