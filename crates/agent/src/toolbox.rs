//! Toolbox: dispatch table for the closed tutor tool set.
//!
//! The orchestrator decides which tools run; the toolbox only routes each
//! invocation to its backend and reports the outcome.

use chrono::{DateTime, Utc};
use learnloop_core::error::Result;
use learnloop_core::profile::{Level, Profile, ProfileStore};
use learnloop_core::tool::{ToolDefinition, ToolKind, WebSearch};
use learnloop_tools::analytics::{AnalyticsLog, InteractionRecord};
use learnloop_tools::knowledge_base::{KnowledgeBase, KnowledgeEntry};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::progress;

/// One tool call with its arguments.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    Search {
        query: String,
    },
    ProfileUpdate {
        student_id: String,
        detected: BTreeSet<String>,
        now: DateTime<Utc>,
    },
    Analytics {
        student_id: String,
        record: InteractionRecord,
    },
    /// Count a newly opened session on the student's profile.
    SessionStart {
        student_id: String,
    },
    KnowledgeBase {
        topic: String,
        level: Level,
    },
}

impl ToolInvocation {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::Search { .. } => ToolKind::WebSearch,
            ToolInvocation::ProfileUpdate { .. } => ToolKind::ProfileUpdate,
            ToolInvocation::Analytics { .. } => ToolKind::Analytics,
            ToolInvocation::SessionStart { .. } => ToolKind::ProfileUpdate,
            ToolInvocation::KnowledgeBase { .. } => ToolKind::KnowledgeBase,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ToolOutcome {
    SearchResults(String),
    Profile(Profile),
    Recorded,
    Content(Option<KnowledgeEntry>),
}

#[derive(Clone)]
pub struct Toolbox {
    search: Arc<dyn WebSearch>,
    profiles: Arc<dyn ProfileStore>,
    analytics: Arc<AnalyticsLog>,
    knowledge: Arc<KnowledgeBase>,
}

impl Toolbox {
    pub fn new(search: Arc<dyn WebSearch>, profiles: Arc<dyn ProfileStore>, analytics: Arc<AnalyticsLog>) -> Self {
        Self {
            search,
            profiles,
            analytics,
            knowledge: Arc::new(KnowledgeBase::builtin()),
        }
    }

    /// Definitions for every tool, for advertising to clients.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL.iter().map(ToolKind::definition).collect()
    }

    pub fn search(&self) -> &Arc<dyn WebSearch> {
        &self.search
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn analytics(&self) -> &Arc<AnalyticsLog> {
        &self.analytics
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub async fn dispatch(&self, invocation: ToolInvocation) -> Result<ToolOutcome> {
        debug!(tool = %invocation.kind(), "Dispatching tool");

        match invocation {
            ToolInvocation::Search { query } => Ok(ToolOutcome::SearchResults(self.search.query(&query).await)),
            ToolInvocation::ProfileUpdate {
                student_id,
                detected,
                now,
            } => {
                let updated = self
                    .profiles
                    .update(&student_id, Box::new(move |current: Profile| progress::apply(&current, &detected, now)))
                    .await?;
                Ok(ToolOutcome::Profile(updated))
            }
            ToolInvocation::Analytics { student_id, record } => {
                self.analytics.record(&student_id, record).await;
                Ok(ToolOutcome::Recorded)
            }
            ToolInvocation::SessionStart { student_id } => {
                let updated = self
                    .profiles
                    .update(&student_id, Box::new(|current: Profile| progress::start_session(&current)))
                    .await?;
                Ok(ToolOutcome::Profile(updated))
            }
            ToolInvocation::KnowledgeBase { topic, level } => {
                Ok(ToolOutcome::Content(self.knowledge.get(&topic, level).cloned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use learnloop_store::InMemoryProfileStore;

    struct EchoSearch;

    #[async_trait]
    impl WebSearch for EchoSearch {
        fn name(&self) -> &str {
            "echo"
        }

        async fn query(&self, text: &str) -> String {
            format!("results for {text}")
        }
    }

    fn toolbox() -> Toolbox {
        Toolbox::new(
            Arc::new(EchoSearch),
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(AnalyticsLog::new()),
        )
    }

    #[tokio::test]
    async fn search_routes_to_backend() {
        let out = toolbox()
            .dispatch(ToolInvocation::Search { query: "ai news".into() })
            .await
            .unwrap();
        assert!(matches!(out, ToolOutcome::SearchResults(s) if s == "results for ai news"));
    }

    #[tokio::test]
    async fn profile_update_persists() {
        let tb = toolbox();
        let detected = BTreeSet::from(["NLP".to_string()]);
        let out = tb
            .dispatch(ToolInvocation::ProfileUpdate {
                student_id: "amy".into(),
                detected,
                now: Utc::now(),
            })
            .await
            .unwrap();
        let ToolOutcome::Profile(p) = out else {
            panic!("expected profile outcome");
        };
        assert_eq!(p.progress(), 5);
        assert_eq!(tb.profiles().load("amy").await, p);
    }

    #[tokio::test]
    async fn analytics_records() {
        let tb = toolbox();
        let record = InteractionRecord {
            session_id: "s".into(),
            topics: vec![],
            tools_used: vec![],
            timestamp: Utc::now(),
        };
        tb.dispatch(ToolInvocation::Analytics {
            student_id: "amy".into(),
            record,
        })
        .await
        .unwrap();
        assert_eq!(tb.analytics().interactions("amy").await, 1);
    }

    #[tokio::test]
    async fn session_start_counts_sessions() {
        let tb = toolbox();
        for _ in 0..2 {
            tb.dispatch(ToolInvocation::SessionStart {
                student_id: "amy".into(),
            })
            .await
            .unwrap();
        }
        let p = tb.profiles().load("amy").await;
        assert_eq!(p.total_sessions, 2);
        assert_eq!(p.total_questions, 0);
    }

    #[tokio::test]
    async fn knowledge_lookup_respects_level() {
        let tb = toolbox();
        let hit = tb
            .dispatch(ToolInvocation::KnowledgeBase {
                topic: "machine_learning_basics".into(),
                level: Level::Beginner,
            })
            .await
            .unwrap();
        assert!(matches!(hit, ToolOutcome::Content(Some(e)) if e.title == "Introduction to Machine Learning"));

        let miss = tb
            .dispatch(ToolInvocation::KnowledgeBase {
                topic: "machine_learning_basics".into(),
                level: Level::Advanced,
            })
            .await
            .unwrap();
        assert!(matches!(miss, ToolOutcome::Content(None)));
    }

    #[test]
    fn definitions_cover_all_tools() {
        let defs = toolbox().definitions();
        assert_eq!(defs.len(), 4);
        assert!(defs.iter().any(|d| d.name == "knowledge_base"));
    }
}
