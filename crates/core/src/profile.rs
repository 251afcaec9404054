//! Student profile: the long-term learning state.
//!
//! `level` is always derived from `progress` and the topic count. The fields
//! that feed it are private so no caller can store an inconsistent level;
//! deserialized records are reconciled on the way in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::StorageError;

/// Upper bound on `progress`.
pub const MAX_PROGRESS: u8 = 100;

/// Learning level, ordered from least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Expert => "Expert",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level for a given progress score and distinct topic count.
///
/// Tiers are checked lowest first and the first match wins. Each tier holds
/// the student back if EITHER gate is below its threshold, so high progress
/// with few topics stays at Beginner.
pub fn level_for(progress: u8, topic_count: usize) -> Level {
    if progress < 20 || topic_count < 2 {
        Level::Beginner
    } else if progress < 50 || topic_count < 5 {
        Level::Intermediate
    } else if progress < 80 || topic_count < 8 {
        Level::Advanced
    } else {
        Level::Expert
    }
}

/// A milestone earned by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

/// Persistent per-student learning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProfileRecord")]
pub struct Profile {
    pub student_id: String,
    level: Level,
    progress: u8,
    topics: BTreeSet<String>,
    pub total_questions: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub total_sessions: u64,
    /// Consecutive calendar days (UTC) with at least one turn.
    pub learning_streak_days: u32,
    pub achievements: Vec<Achievement>,
}

impl Profile {
    /// A fresh profile: Beginner, no progress, no topics.
    pub fn new(student_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            student_id: student_id.into(),
            level: Level::Beginner,
            progress: 0,
            topics: BTreeSet::new(),
            total_questions: 0,
            created_at: now,
            last_active_at: now,
            total_sessions: 0,
            learning_streak_days: 0,
            achievements: Vec::new(),
        }
    }

    /// Build a profile from its raw parts. Progress is clamped and the level
    /// recomputed.
    pub fn from_parts(
        student_id: impl Into<String>,
        progress: u8,
        topics: BTreeSet<String>,
        total_questions: u64,
        created_at: DateTime<Utc>,
        last_active_at: DateTime<Utc>,
    ) -> Self {
        let progress = progress.min(MAX_PROGRESS);
        Self {
            student_id: student_id.into(),
            level: level_for(progress, topics.len()),
            progress,
            topics,
            total_questions,
            created_at,
            last_active_at,
            total_sessions: 0,
            learning_streak_days: 0,
            achievements: Vec::new(),
        }
    }

    /// Carry session count, streak and achievements over from another record.
    pub fn with_activity(mut self, total_sessions: u64, learning_streak_days: u32, achievements: Vec<Achievement>) -> Self {
        self.total_sessions = total_sessions;
        self.learning_streak_days = learning_streak_days;
        self.achievements = achievements;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }
}

/// On-disk shape. `level` is read for compatibility but never trusted.
#[derive(Deserialize)]
struct ProfileRecord {
    student_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    level: Option<Level>,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    topics: BTreeSet<String>,
    #[serde(default)]
    total_questions: u64,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    #[serde(default)]
    total_sessions: u64,
    #[serde(default)]
    learning_streak_days: u32,
    #[serde(default)]
    achievements: Vec<Achievement>,
}

impl From<ProfileRecord> for Profile {
    fn from(r: ProfileRecord) -> Self {
        Profile::from_parts(
            r.student_id,
            r.progress,
            r.topics,
            r.total_questions,
            r.created_at,
            r.last_active_at,
        )
        .with_activity(r.total_sessions, r.learning_streak_days, r.achievements)
    }
}

/// Mutation applied inside [`ProfileStore::update`].
pub type ProfileUpdate = Box<dyn FnOnce(Profile) -> Profile + Send>;

/// Persistence for student profiles.
///
/// `load` never reports "not found": an absent or unreadable record yields a
/// fresh default profile. `update` is the only read-modify-write path and
/// implementations must serialize it per student id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Backend name for logging (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Load a profile, creating a default one when absent.
    async fn load(&self, student_id: &str) -> Profile;

    /// Durably write a profile.
    async fn save(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Load, apply `f`, save, and return the saved profile.
    async fn update(&self, student_id: &str, f: ProfileUpdate) -> Result<Profile, StorageError>;
}
