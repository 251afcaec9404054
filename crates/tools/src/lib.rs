//! Tool backends for LearnLoop.
//!
//! Web search (Brave with an offline fallback), interaction analytics and
//! the curated knowledge base. Profile updates go through
//! `learnloop_core::ProfileStore`; the agent crate's `Toolbox` dispatches
//! every tool.

pub mod analytics;
pub mod knowledge_base;
pub mod web_search;

pub use analytics::{AnalyticsLog, DailyPoint, InteractionRecord, LearningGraph, ProgressSummary};
pub use knowledge_base::{KnowledgeBase, KnowledgeEntry};
pub use web_search::{BraveSearch, OfflineSearch, SearchHit, format_results};
