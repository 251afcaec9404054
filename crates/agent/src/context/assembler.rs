//! Context assembly pipeline.
//!
//! Builds the system prompt for one turn and selects how much conversation
//! history fits beside it:
//!
//! 1. **System prompt** (base text + student profile + guidelines), reserved first
//! 2. **Extra context** (current user message, search results), reserved second
//! 3. **Conversation history**, walked newest → oldest until a message no
//!    longer fits, then returned in chronological order
//!
//! # Determinism
//!
//! Identical inputs always produce identical outputs. No clock reads or
//! randomness happen during assembly.

use crate::context::token;
use learnloop_core::message::Message;
use learnloop_core::profile::Profile;
use serde::{Deserialize, Serialize};

/// Messages shown in the profile section of the system prompt.
const PROFILE_RECENT_MESSAGES: usize = 3;
/// Character cap per message in the profile section.
const PROFILE_MESSAGE_CHARS: usize = 200;

// ── Types ─────────────────────────────────────────────────────────────────

/// All inputs required by the assembler for a single LLM call.
pub struct AssemblyInput<'a> {
    /// Base tutor instructions.
    pub base_prompt: &'a str,
    /// Teaching guidelines appended after the profile section.
    pub guidelines: &'a str,
    /// Snapshot of the student's profile.
    pub profile: &'a Profile,
    /// Candidate history messages, chronological.
    pub history: &'a [Message],
    /// Text sent alongside the history that must also fit (the current user
    /// message, with any search results).
    pub extra: &'a str,
}

/// The assembled context, ready for an LLM API call.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// System prompt (base + profile section + guidelines).
    pub system_prompt: String,
    /// History messages that fit the budget, chronological.
    pub messages: Vec<Message>,
    /// Assembly metadata (token counts, drops, utilization).
    pub metadata: AssemblyMetadata,
}

/// Token accounting for one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    pub budget: usize,
    pub system_tokens: usize,
    pub extra_tokens: usize,
    pub history_tokens: usize,
    /// System + extra + included history.
    pub total_tokens: usize,
    pub messages_included: usize,
    pub messages_dropped: usize,
    /// Budget utilization percentage (0.0–100.0, may exceed 100 when the
    /// reserved text alone is over budget).
    pub utilization_pct: f32,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless, so one instance can be reused.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_tokens: usize,
    recent_keep: usize,
}

impl ContextAssembler {
    /// Create a new assembler with the given token budget.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            recent_keep: 3,
        }
    }

    /// Create an assembler with the default budget (4000 tokens).
    pub fn with_default_budget() -> Self {
        Self::new(4000)
    }

    /// Number of most recent messages `prioritize` always keeps.
    pub fn with_recent_keep(mut self, recent_keep: usize) -> Self {
        self.recent_keep = recent_keep;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Assemble the system prompt and the history that fits beside it.
    ///
    /// If the system prompt and extra text alone exceed the budget, the
    /// returned message list is empty; that is not an error.
    pub fn build(&self, input: &AssemblyInput<'_>) -> AssembledContext {
        let system_prompt = Self::render_system_prompt(
            input.base_prompt,
            input.profile,
            input.history,
            input.guidelines,
        );

        let system_tokens = token::estimate_tokens(&system_prompt);
        let extra_tokens = token::estimate_tokens(input.extra);
        let reserved = system_tokens + extra_tokens;

        let (messages, history_tokens) = if reserved > self.max_tokens {
            (Vec::new(), 0)
        } else {
            Self::fill_history(input.history, self.max_tokens - reserved)
        };

        let total_tokens = reserved + history_tokens;
        let metadata = AssemblyMetadata {
            budget: self.max_tokens,
            system_tokens,
            extra_tokens,
            history_tokens,
            total_tokens,
            messages_included: messages.len(),
            messages_dropped: input.history.len() - messages.len(),
            utilization_pct: if self.max_tokens == 0 {
                0.0
            } else {
                total_tokens as f32 / self.max_tokens as f32 * 100.0
            },
        };

        AssembledContext {
            system_prompt,
            messages,
            metadata,
        }
    }

    /// Keep the last `recent_keep` messages unconditionally; of the older
    /// ones keep only those mentioning an important topic (case-insensitive
    /// substring). Relative order is preserved, recent messages last.
    pub fn prioritize<S: AsRef<str>>(&self, messages: &[Message], important_topics: &[S]) -> Vec<Message> {
        if messages.is_empty() {
            return Vec::new();
        }

        let split = messages.len().saturating_sub(self.recent_keep);
        let (older, recent) = messages.split_at(split);

        let topics: Vec<String> = important_topics
            .iter()
            .map(|t| t.as_ref().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        older
            .iter()
            .filter(|m| {
                let content = m.content.to_lowercase();
                topics.iter().any(|t| content.contains(t.as_str()))
            })
            .chain(recent.iter())
            .cloned()
            .collect()
    }

    /// Render the full system prompt for a student.
    pub fn render_system_prompt(
        base_prompt: &str,
        profile: &Profile,
        history: &[Message],
        guidelines: &str,
    ) -> String {
        let topics = if profile.topics().is_empty() {
            "None yet".to_string()
        } else {
            profile.topics().iter().cloned().collect::<Vec<_>>().join(", ")
        };

        format!(
            "{base_prompt}\n\nStudent Profile:\n- Level: {}\n- Progress: {}%\n- Previously Learned Topics: {topics}\n\nRecent Conversation Context:\n{}\n\n{guidelines}\n",
            profile.level(),
            profile.progress(),
            Self::render_recent(history),
        )
    }

    // ── Layers ─────────────────────────────────────────────────────────────

    fn render_recent(history: &[Message]) -> String {
        if history.is_empty() {
            return "This is the start of a new session.".into();
        }

        let start = history.len().saturating_sub(PROFILE_RECENT_MESSAGES);
        history[start..]
            .iter()
            .map(|m| {
                let content: String = m.content.chars().take(PROFILE_MESSAGE_CHARS).collect();
                format!("{}: {}", m.role.title(), content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sliding window: include from newest → oldest, stop at the first
    /// message that does not fit.
    fn fill_history(history: &[Message], budget: usize) -> (Vec<Message>, usize) {
        let mut used = 0;
        let mut included = Vec::new();

        for msg in history.iter().rev() {
            let cost = token::estimate_message_tokens(msg);
            if used + cost > budget {
                break;
            }
            included.push(msg.clone());
            used += cost;
        }

        // Reverse to restore chronological order.
        included.reverse();
        (included, used)
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::with_default_budget()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    // ── Helpers ────────────────────────────────────────────────────────

    fn profile() -> Profile {
        Profile::new("alice", Utc::now())
    }

    fn input<'a>(profile: &'a Profile, history: &'a [Message], extra: &'a str) -> AssemblyInput<'a> {
        AssemblyInput {
            base_prompt: "You are a tutor.",
            guidelines: "Be kind.",
            profile,
            history,
            extra,
        }
    }

    fn msgs(n: usize, len: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                let body = format!("{i:03}{}", "x".repeat(len.saturating_sub(3)));
                if i % 2 == 0 { Message::user(body) } else { Message::assistant(body) }
            })
            .collect()
    }

    // ── Tests ──────────────────────────────────────────────────────────

    #[test]
    fn empty_history_yields_empty_list() {
        let p = profile();
        let ctx = ContextAssembler::new(4000).build(&input(&p, &[], "hi"));
        assert!(ctx.messages.is_empty());
        assert!(ctx.system_prompt.contains("This is the start of a new session."));
        assert_eq!(ctx.metadata.messages_dropped, 0);
    }

    #[test]
    fn system_prompt_renders_profile() {
        let now = Utc::now();
        let topics: BTreeSet<String> = ["NLP", "AI Ethics"].iter().map(|s| s.to_string()).collect();
        let p = Profile::from_parts("bob", 25, topics, 3, now, now);
        let prompt = ContextAssembler::render_system_prompt("BASE", &p, &[], "GUIDE");

        assert!(prompt.starts_with("BASE\n\nStudent Profile:"));
        assert!(prompt.contains("- Level: Intermediate"));
        assert!(prompt.contains("- Progress: 25%"));
        assert!(prompt.contains("- Previously Learned Topics: AI Ethics, NLP"));
        assert!(prompt.trim_end().ends_with("GUIDE"));
    }

    #[test]
    fn new_profile_shows_none_yet() {
        let prompt = ContextAssembler::render_system_prompt("B", &profile(), &[], "G");
        assert!(prompt.contains("Previously Learned Topics: None yet"));
    }

    #[test]
    fn recent_section_shows_last_three_truncated() {
        let history = vec![
            Message::user("first"),
            Message::assistant("second"),
            Message::user("third"),
            Message::assistant("y".repeat(300)),
        ];
        let prompt = ContextAssembler::render_system_prompt("B", &profile(), &history, "G");
        assert!(!prompt.contains("User: first"));
        assert!(prompt.contains("Assistant: second"));
        assert!(prompt.contains("User: third"));
        assert!(prompt.contains(&format!("Assistant: {}\n", "y".repeat(200))));
        assert!(!prompt.contains(&"y".repeat(201)));
    }

    #[test]
    fn all_history_fits_large_budget() {
        let p = profile();
        let history = msgs(6, 40);
        let ctx = ContextAssembler::new(100_000).build(&input(&p, &history, "now"));
        assert_eq!(ctx.messages, history);
        assert_eq!(ctx.metadata.messages_included, 6);
    }

    #[test]
    fn budget_respected_and_newest_kept() {
        let p = profile();
        let history = msgs(20, 80); // 20 tokens each
        let asm = ContextAssembler::new(0);
        let reserved = token::estimate_tokens(&ContextAssembler::render_system_prompt(
            "You are a tutor.",
            &p,
            &history,
            "Be kind.",
        )) + token::estimate_tokens("extra");

        let ctx = ContextAssembler { max_tokens: reserved + 65, ..asm }.build(&input(&p, &history, "extra"));

        // 65 tokens of room → 3 messages of 20
        assert_eq!(ctx.messages.len(), 3);
        assert_eq!(ctx.messages, history[17..].to_vec());
        assert!(ctx.metadata.total_tokens <= ctx.metadata.budget);
        assert_eq!(ctx.metadata.messages_dropped, 17);
    }

    #[test]
    fn walk_stops_at_first_message_that_does_not_fit() {
        let p = profile();
        let history = vec![
            Message::user("tiny"),             // 1 token
            Message::assistant("z".repeat(400)), // 100 tokens
            Message::user("abcd"),             // 1 token
        ];
        let reserved = token::estimate_tokens(&ContextAssembler::render_system_prompt(
            "You are a tutor.",
            &p,
            &history,
            "Be kind.",
        ));
        let ctx = ContextAssembler::new(reserved + 10).build(&input(&p, &history, ""));

        // "tiny" would fit, but the walk stopped at the 100-token message
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.messages[0].content, "abcd");
    }

    #[test]
    fn budget_smaller_than_system_prompt_is_not_an_error() {
        let p = profile();
        let history = vec![Message::user(""), Message::user("hello")];
        let ctx = ContextAssembler::new(5).build(&input(&p, &history, "hi"));
        assert!(ctx.messages.is_empty());
        assert!(!ctx.system_prompt.is_empty());
        assert!(ctx.metadata.utilization_pct > 100.0);
    }

    #[test]
    fn assembly_is_deterministic() {
        let p = profile();
        let history = msgs(10, 50);
        let asm = ContextAssembler::new(600);
        let a = asm.build(&input(&p, &history, "q"));
        let b = asm.build(&input(&p, &history, "q"));
        assert_eq!(a.system_prompt, b.system_prompt);
        assert_eq!(a.messages, b.messages);
        assert_eq!(a.metadata, b.metadata);
    }

    #[test]
    fn prioritize_keeps_recent_and_relevant() {
        let history = vec![
            Message::user("Tell me about neural networks"),
            Message::assistant("Sure, cooking tips"),
            Message::user("What about NLP?"),
            Message::assistant("r1"),
            Message::user("r2"),
            Message::assistant("r3"),
        ];
        let kept = ContextAssembler::default().prioritize(&history, &["Neural Networks", "nlp"]);
        let contents: Vec<&str> = kept.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Tell me about neural networks", "What about NLP?", "r1", "r2", "r3"]
        );
    }

    #[test]
    fn prioritize_short_history_keeps_all() {
        let history = msgs(2, 10);
        let none: [&str; 0] = [];
        assert_eq!(ContextAssembler::default().prioritize(&history, &none), history);
        assert!(ContextAssembler::default().prioritize(&[], &none).is_empty());
    }

    #[test]
    fn prioritize_respects_recent_keep() {
        let history = msgs(6, 10);
        let none: [&str; 0] = [];
        let kept = ContextAssembler::default().with_recent_keep(1).prioritize(&history, &none);
        assert_eq!(kept, history[5..].to_vec());
    }
}
