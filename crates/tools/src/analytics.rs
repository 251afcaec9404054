//! Interaction analytics: per-student event log and learning graph.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

/// One processed turn, as seen by analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub session_id: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub student_id: String,
    pub total_interactions: usize,
    pub topics_explored: Vec<String>,
    pub unique_topics_count: usize,
    pub last_active: Option<DateTime<Utc>>,
}

/// Activity for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub interactions: usize,
    pub unique_topics: usize,
    pub cumulative_topics: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningGraph {
    pub student_id: String,
    pub graph_data: Vec<DailyPoint>,
    pub total_learning_days: usize,
    pub total_topics_learned: usize,
}

/// In-memory analytics store shared by all sessions.
#[derive(Default)]
pub struct AnalyticsLog {
    records: RwLock<HashMap<String, Vec<InteractionRecord>>>,
}

impl AnalyticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, student_id: &str, record: InteractionRecord) {
        self.records
            .write()
            .await
            .entry(student_id.to_string())
            .or_default()
            .push(record);
    }

    pub async fn interactions(&self, student_id: &str) -> usize {
        self.records
            .read()
            .await
            .get(student_id)
            .map_or(0, Vec::len)
    }

    pub async fn progress_summary(&self, student_id: &str) -> ProgressSummary {
        let records = self.records.read().await;
        let events = records.get(student_id).map(Vec::as_slice).unwrap_or(&[]);

        let topics: BTreeSet<&str> = events
            .iter()
            .flat_map(|e| e.topics.iter().map(String::as_str))
            .collect();

        ProgressSummary {
            student_id: student_id.to_string(),
            total_interactions: events.len(),
            unique_topics_count: topics.len(),
            topics_explored: topics.into_iter().map(String::from).collect(),
            last_active: events.iter().map(|e| e.timestamp).max(),
        }
    }

    /// Per-day activity with running topic totals, oldest day first.
    pub async fn learning_graph(&self, student_id: &str) -> LearningGraph {
        let records = self.records.read().await;
        let events = records.get(student_id).map(Vec::as_slice).unwrap_or(&[]);

        let mut daily: BTreeMap<NaiveDate, (usize, BTreeSet<&str>)> = BTreeMap::new();
        for e in events {
            let day = daily.entry(e.timestamp.date_naive()).or_default();
            day.0 += 1;
            day.1.extend(e.topics.iter().map(String::as_str));
        }

        let mut cumulative: BTreeSet<&str> = BTreeSet::new();
        let graph_data = daily
            .iter()
            .map(|(date, (interactions, topics))| {
                cumulative.extend(topics.iter().copied());
                DailyPoint {
                    date: *date,
                    interactions: *interactions,
                    unique_topics: topics.len(),
                    cumulative_topics: cumulative.len(),
                }
            })
            .collect();

        LearningGraph {
            student_id: student_id.to_string(),
            graph_data,
            total_learning_days: daily.len(),
            total_topics_learned: cumulative.len(),
        }
    }
}
