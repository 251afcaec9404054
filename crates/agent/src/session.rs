//! Session state: short-term conversational memory for one tutoring session.
//!
//! Holds a bounded ring buffer of messages, an unbounded event log and the set
//! of topics discussed. Everything here is synchronous; the orchestrator owns
//! exactly one `SessionState` and mutates it between awaits.

use chrono::{DateTime, Utc};
use learnloop_core::message::{Message, Role, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Default number of messages kept per session.
pub const DEFAULT_CAPACITY: usize = 50;

const CONTEXT_SUMMARY_MESSAGES: usize = 5;
const CONTEXT_SUMMARY_CHARS: usize = 100;

/// One telemetry entry in the session event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Aggregate view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_seconds: i64,
    pub duration_formatted: String,
    pub total_messages: usize,
    pub user_messages: usize,
    pub ai_responses: usize,
    pub topics_discussed: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub events_count: usize,
}

/// Full dump of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub session_id: String,
    pub student_id: String,
    pub start_time: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<Message>,
    pub events: Vec<SessionEvent>,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    student_id: String,
    capacity: usize,
    start_time: DateTime<Utc>,
    messages: VecDeque<Message>,
    events: Vec<SessionEvent>,
    topics_discussed: BTreeSet<String>,
    message_count: usize,
}

impl SessionState {
    pub fn new(student_id: impl Into<String>, capacity: usize, now: DateTime<Utc>) -> Self {
        let student_id = student_id.into();
        Self::with_id(SessionId::generate(&student_id, now), student_id, capacity, now)
    }

    /// Create a session with a caller-chosen id.
    pub fn with_id(id: SessionId, student_id: impl Into<String>, capacity: usize, now: DateTime<Utc>) -> Self {
        let capacity = capacity.max(1);
        Self {
            id,
            student_id: student_id.into(),
            capacity,
            start_time: now,
            messages: VecDeque::with_capacity(capacity),
            events: Vec::new(),
            topics_discussed: BTreeSet::new(),
            message_count: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Total messages ever recorded; eviction does not reduce it.
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn topics_discussed(&self) -> &BTreeSet<String> {
        &self.topics_discussed
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Messages currently held, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn record_message(&mut self, message: Message) {
        self.topics_discussed.extend(message.topics.iter().cloned());
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
        self.message_count += 1;
    }

    /// Append an event; its id is `{session_id}_{n}` with `n` counting from 0.
    pub fn record_event(&mut self, data: serde_json::Value, timestamp: Option<DateTime<Utc>>) -> &SessionEvent {
        let event = SessionEvent {
            event_id: format!("{}_{}", self.id, self.events.len()),
            timestamp: timestamp.unwrap_or_else(Utc::now),
            data,
        };
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Last `limit` messages in chronological order.
    pub fn recent_messages(&self, limit: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(start).cloned().collect()
    }

    pub fn summarize(&self, now: DateTime<Utc>) -> SessionSummary {
        let duration_seconds = (now - self.start_time).num_seconds().max(0);
        let user_messages = self.messages.iter().filter(|m| m.role == Role::User).count();
        let ai_responses = self.messages.iter().filter(|m| m.role == Role::Assistant).count();

        SessionSummary {
            session_id: self.id.to_string(),
            duration_seconds,
            duration_formatted: format_duration(duration_seconds),
            total_messages: self.messages.len(),
            user_messages,
            ai_responses,
            topics_discussed: self.topics_discussed.iter().cloned().collect(),
            start_time: self.start_time,
            end_time: now,
            events_count: self.events.len(),
        }
    }

    /// Short plain-text recap used when handing a session to a human.
    pub fn context_summary(&self, now: DateTime<Utc>) -> String {
        if self.messages.is_empty() {
            return "New session, no previous context.".into();
        }

        let summary = self.summarize(now);
        let topics = if summary.topics_discussed.is_empty() {
            "None".to_string()
        } else {
            summary.topics_discussed.join(", ")
        };

        let mut out = format!(
            "Session Duration: {}\nMessages Exchanged: {}\nTopics Covered: {}\n\nRecent Messages:\n",
            summary.duration_formatted, summary.total_messages, topics
        );
        for m in self.recent_messages(CONTEXT_SUMMARY_MESSAGES) {
            let mut chars = m.content.chars();
            let head: String = chars.by_ref().take(CONTEXT_SUMMARY_CHARS).collect();
            let ellipsis = if chars.next().is_some() { "..." } else { "" };
            out.push_str(&format!("{}: {head}{ellipsis}\n", m.role.title()));
        }
        out
    }

    pub fn export(&self, now: DateTime<Utc>) -> SessionExport {
        SessionExport {
            session_id: self.id.to_string(),
            student_id: self.student_id.clone(),
            start_time: self.start_time,
            message_count: self.message_count,
            messages: self.messages.iter().cloned().collect(),
            events: self.events.clone(),
            summary: self.summarize(now),
        }
    }

    /// Drop all messages and reset the counter. Id, start time, events and
    /// topics are kept.
    pub fn clear_history(&mut self) {
        self.messages.clear();
        self.message_count = 0;
    }

    /// A fresh session for the same student and capacity.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        Self::new(self.student_id.clone(), self.capacity, now)
    }
}

/// Human-readable duration: "N seconds", "N minute(s)" or "Hh Mm".
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{seconds} seconds")
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
