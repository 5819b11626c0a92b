//! Conversation memory
//!
//! Bounded, per-session turn history and rendering of the full prompt handed
//! to the inference engine. Sessions live in memory for the lifetime of the
//! process and are never persisted.

pub mod format;

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::{Role, Turn};

pub use format::{InstructionFormat, DEFAULT_PREAMBLE};

/// Default cap on turns kept per session
pub const DEFAULT_MAX_TURNS: usize = 10;

/// What `append` did with a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Pushed after the last turn
    Appended,
    /// Replaced an unanswered user turn
    ReplacedPending,
    /// Assistant turn with no user turn to answer; not recorded
    DroppedOrphan,
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum turns kept per session; evicted oldest-pair first
    pub max_turns: usize,
    /// Persona text prepended to every prompt
    pub preamble: String,
    /// Instruction delimiters
    pub format: InstructionFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            preamble: DEFAULT_PREAMBLE.to_string(),
            format: InstructionFormat::default(),
        }
    }
}

/// One session's history
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
    last_active: Instant,
}

impl Conversation {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_active: Instant::now(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Committed (user, assistant) pairs, oldest first.
    pub fn pairs(&self) -> impl Iterator<Item = (&Turn, &Turn)> {
        self.turns
            .chunks_exact(2)
            .filter(|pair| pair[0].role == Role::User && pair[1].role == Role::Assistant)
            .map(|pair| (&pair[0], &pair[1]))
    }

    fn has_pending_user(&self) -> bool {
        self.turns.last().is_some_and(|t| t.role == Role::User)
    }

    fn push(&mut self, turn: Turn, max_turns: usize) -> AppendOutcome {
        self.last_active = Instant::now();

        let outcome = match (turn.role, self.has_pending_user()) {
            (Role::User, true) => {
                if let Some(last) = self.turns.last_mut() {
                    *last = turn;
                }
                AppendOutcome::ReplacedPending
            }
            (Role::User, false) | (Role::Assistant, true) => {
                self.turns.push(turn);
                AppendOutcome::Appended
            }
            (Role::Assistant, false) => return AppendOutcome::DroppedOrphan,
        };

        // Evict whole pairs so the history still opens with a user turn.
        while self.turns.len() > max_turns {
            let n = self.turns.len().min(2);
            self.turns.drain(..n);
        }

        outcome
    }
}

/// Per-session conversation histories
///
/// Shared by reference (`Arc<ConversationStore>`) between request handlers.
/// Mutation of one session is atomic with respect to other requests for the
/// same session; different sessions do not contend beyond a map shard.
pub struct ConversationStore {
    sessions: DashMap<String, Conversation>,
    config: StoreConfig,
}

impl ConversationStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn max_turns(&self) -> usize {
        self.config.max_turns
    }

    /// Record a turn, creating the session on first use.
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> AppendOutcome {
        let mut conversation = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(Conversation::new);
        let outcome = conversation.push(Turn::new(role, content), self.config.max_turns);

        match outcome {
            AppendOutcome::DroppedOrphan => {
                tracing::warn!(session = session_id, "Dropped assistant turn with no pending user turn");
            }
            AppendOutcome::ReplacedPending => {
                tracing::debug!(session = session_id, "Replaced unanswered user turn");
            }
            AppendOutcome::Appended => {}
        }
        outcome
    }

    /// Build the prompt for `new_user_message` on top of the session's
    /// committed history. Does not modify the history.
    pub fn render(&self, session_id: &str, new_user_message: &str) -> String {
        let format = &self.config.format;
        let mut prompt = format!("{}{}", format.bos, format.instruction(&self.config.preamble));

        if let Some(conversation) = self.sessions.get(session_id) {
            for (user, assistant) in conversation.pairs() {
                prompt.push(' ');
                prompt.push_str(&format.instruction(&user.content));
                prompt.push(' ');
                prompt.push_str(&assistant.content);
            }
        }

        prompt.push(' ');
        prompt.push_str(&format.instruction(new_user_message));
        prompt
    }

    /// Forget a session's history. Unknown sessions are fine.
    pub fn clear(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::info!(session = session_id, "Conversation cleared");
        }
    }

    /// Snapshot of a session's turns; empty for unknown sessions.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|c| c.turns().to_vec())
            .unwrap_or_default()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions with no activity for longer than `max_idle`.
    /// Returns how many were removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, conversation| conversation.last_active.elapsed() <= max_idle);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!(removed, "Pruned idle sessions");
        }
        removed
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_cap(max_turns: usize) -> ConversationStore {
        ConversationStore::new(StoreConfig {
            max_turns,
            preamble: "PREAMBLE".to_string(),
            ..Default::default()
        })
    }

    fn assert_alternates(turns: &[Turn]) {
        for (i, turn) in turns.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected, "turn {i} out of order");
        }
    }

    fn append_alternating(store: &ConversationStore, session: &str, count: usize) {
        for i in 0..count {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append(session, role, format!("t{}", i + 1));
        }
    }

    #[test]
    fn test_history_stays_bounded_and_alternating() {
        let store = store_with_cap(10);
        for count in 1..40 {
            store.clear("s");
            append_alternating(&store, "s", count);
            let turns = store.get("s");
            assert!(turns.len() <= 10);
            assert_alternates(&turns);
        }
    }

    #[test]
    fn test_eviction_removes_oldest_pair() {
        let store = store_with_cap(10);
        append_alternating(&store, "s", 11);

        let turns = store.get("s");
        assert_eq!(turns.len(), 9);
        assert_eq!(turns[0].content, "t3");
        assert_eq!(turns.last().unwrap().content, "t11");
        assert_eq!(turns.last().unwrap().role, Role::User);

        store.append("s", Role::Assistant, "t12");
        let turns = store.get("s");
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "t3");
        assert_alternates(&turns);
    }

    #[test]
    fn test_twelve_turns_fill_cap_exactly() {
        let store = store_with_cap(10);
        append_alternating(&store, "s", 12);
        let turns = store.get("s");
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "t3");
    }

    #[test]
    fn test_user_over_pending_user_replaces() {
        let store = store_with_cap(10);
        store.append("s", Role::User, "first");
        let outcome = store.append("s", Role::User, "second");
        assert_eq!(outcome, AppendOutcome::ReplacedPending);

        let turns = store.get("s");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "second");
    }

    #[test]
    fn test_orphan_assistant_is_dropped() {
        let store = store_with_cap(10);
        assert_eq!(store.append("s", Role::Assistant, "hello"), AppendOutcome::DroppedOrphan);
        assert!(store.get("s").is_empty());
    }

    #[test]
    fn test_render_without_history() {
        let store = store_with_cap(10);
        store.append("s", Role::User, "hi");
        assert_eq!(store.render("s", "hi"), "<s>[INST] PREAMBLE [/INST] [INST] hi [/INST]");
    }

    #[test]
    fn test_render_with_one_pair() {
        let store = store_with_cap(10);
        store.append("s", Role::User, "hi");
        store.render("s", "hi");
        store.append("s", Role::Assistant, "hello");

        assert_eq!(
            store.render("s", "how are you"),
            "<s>[INST] PREAMBLE [/INST] [INST] hi [/INST] hello [INST] how are you [/INST]"
        );
    }

    #[test]
    fn test_render_is_pure() {
        let store = store_with_cap(10);
        append_alternating(&store, "s", 4);
        let before = store.get("s");

        let first = store.render("s", "next");
        let second = store.render("s", "next");
        assert_eq!(first, second);
        assert_eq!(store.get("s"), before);
    }

    #[test]
    fn test_render_unknown_session_does_not_create_it() {
        let store = store_with_cap(10);
        store.render("ghost", "boo");
        assert!(store.is_empty());
    }

    #[test]
    fn test_render_uses_configured_format() {
        let store = ConversationStore::new(StoreConfig {
            preamble: "P".into(),
            format: InstructionFormat {
                bos: String::new(),
                open: "<INSTR>".into(),
                close: "</INSTR>".into(),
                eos: String::new(),
            },
            ..Default::default()
        });
        assert_eq!(store.render("s", "q"), "<INSTR> P </INSTR> <INSTR> q </INSTR>");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = store_with_cap(10);
        store.clear("never-seen");
        assert!(store.get("never-seen").is_empty());

        append_alternating(&store, "s", 3);
        store.clear("s");
        store.clear("s");
        assert!(store.get("s").is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store_with_cap(10);
        store.append("a", Role::User, "from a");
        store.append("b", Role::User, "from b");

        assert_eq!(store.get("a")[0].content, "from a");
        assert_eq!(store.get("b")[0].content, "from b");
        let mut ids = store.session_ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_prune_idle() {
        let store = store_with_cap(10);
        store.append("old", Role::User, "x");
        std::thread::sleep(Duration::from_millis(60));
        store.append("fresh", Role::User, "y");

        let removed = store.prune_idle(Duration::from_millis(30));
        assert_eq!(removed, 1);
        assert_eq!(store.session_ids(), vec!["fresh".to_string()]);
    }

    #[test]
    fn test_concurrent_appends_keep_invariant() {
        let store = std::sync::Arc::new(store_with_cap(6));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append("shared", Role::User, format!("u{worker}-{i}"));
                        store.append("shared", Role::Assistant, format!("a{worker}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let turns = store.get("shared");
        assert!(turns.len() <= 6);
        assert!(turns.first().map_or(true, |t| t.role == Role::User));
        for pair in turns.windows(2) {
            assert_ne!(pair[0].role, pair[1].role);
        }
    }
}
