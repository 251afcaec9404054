//! Curated lesson content keyed by topic id.

use learnloop_core::profile::Level;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One lesson: summary text plus worked examples and exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub title: String,
    pub level: Level,
    pub content: String,
    pub examples: Vec<String>,
    pub exercises: Vec<String>,
}

impl KnowledgeEntry {
    fn new(title: &str, level: Level, content: &str, examples: &[&str], exercises: &[&str]) -> Self {
        Self {
            title: title.into(),
            level,
            content: content.into(),
            examples: examples.iter().map(|s| s.to_string()).collect(),
            exercises: exercises.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
    /// The bundled lessons.
    pub fn builtin() -> Self {
        let mut kb = Self::default();
        kb.insert(
            "machine_learning_basics",
            KnowledgeEntry::new(
                "Introduction to Machine Learning",
                Level::Beginner,
                "Machine learning is a subset of AI that lets systems learn patterns from data instead of following hand-written rules.",
                &["Email spam detection", "Product recommendations", "Image recognition"],
                &["Identify supervised vs unsupervised learning", "Explain overfitting"],
            ),
        );
        kb.insert(
            "neural_networks",
            KnowledgeEntry::new(
                "Neural Networks Fundamentals",
                Level::Intermediate,
                "Neural networks are inspired by the brain: layers of weighted connections are adjusted during training to map inputs to outputs.",
                &["Image classification with CNNs", "Language translation with RNNs"],
                &["Calculate output of a simple perceptron", "Explain backpropagation"],
            ),
        );
        kb
    }

    pub fn insert(&mut self, topic: impl Into<String>, entry: KnowledgeEntry) {
        self.entries.insert(topic.into(), entry);
    }

    /// Entry for `topic`, only when it is written for exactly `level`.
    pub fn get(&self, topic: &str, level: Level) -> Option<&KnowledgeEntry> {
        self.entries.get(topic).filter(|e| e.level == level)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
