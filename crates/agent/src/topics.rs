//! Keyword topic detection and the browseable topic catalogue.

use learnloop_core::profile::Level;
use serde::Serialize;
use std::collections::BTreeSet;

/// Topic label → keywords. Matching is lowercase substring, any keyword wins.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("Machine Learning", &["machine learning", "ml", "training", "model"]),
    ("Neural Networks", &["neural", "network", "deep learning", "layers"]),
    ("NLP", &["nlp", "language", "text", "chatbot", "sentiment"]),
    ("Computer Vision", &["vision", "image", "detection", "recognition"]),
    ("AI Ethics", &["ethics", "bias", "fairness", "responsible"]),
    ("Generative AI", &["generative", "gpt", "llm", "generate"]),
    ("Reinforcement Learning", &["reinforcement", "reward", "agent", "policy"]),
];

/// All topic labels the detector can produce.
pub fn labels() -> impl Iterator<Item = &'static str> {
    TOPIC_KEYWORDS.iter().map(|(label, _)| *label)
}

/// Detect topic labels mentioned in `text`.
pub fn detect(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(label, _)| label.to_string())
        .collect()
}

// ── Catalogue ────────────────────────────────────────────────────────────

/// A topic students can browse.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogueEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub level: Level,
    pub description: &'static str,
}

pub fn catalogue() -> Vec<CatalogueEntry> {
    let entry = |id, name, level, description| CatalogueEntry {
        id,
        name,
        level,
        description,
    };
    vec![
        entry("machine_learning", "Machine Learning", Level::Beginner, "Learn how computers learn from data"),
        entry("neural_networks", "Neural Networks", Level::Intermediate, "Understand brain-inspired AI models"),
        entry("nlp", "Natural Language Processing", Level::Intermediate, "How AI understands human language"),
        entry(
            "computer_vision",
            "Computer Vision",
            Level::Intermediate,
            "Teaching computers to see and understand images",
        ),
        entry("ai_ethics", "AI Ethics", Level::Beginner, "Responsible and fair AI development"),
        entry("generative_ai", "Generative AI", Level::Advanced, "AI that creates new content"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_is_empty() {
        assert!(detect("What is the capital of France?").is_empty());
        assert!(detect("").is_empty());
    }

    #[test]
    fn case_insensitive_substring() {
        let found = detect("DEEP LEARNING uses many Layers");
        assert_eq!(found, BTreeSet::from(["Neural Networks".to_string()]));
    }

    #[test]
    fn multiple_topics() {
        let found = detect("A chatbot is a language model that can be biased.");
        assert!(found.contains("NLP"));
        assert!(found.contains("Machine Learning"));
        assert!(found.contains("AI Ethics"));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn short_keywords_match_inside_words() {
        // "html" contains "ml"
        assert!(detect("html pages").contains("Machine Learning"));
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "reinforcement learning agents maximise reward";
        assert_eq!(detect(text), detect(text));
        assert!(detect(text).contains("Reinforcement Learning"));
    }

    #[test]
    fn catalogue_has_six_topics() {
        let cat = catalogue();
        assert_eq!(cat.len(), 6);
        assert_eq!(cat[0].id, "machine_learning");
        assert_eq!(cat[5].level, Level::Advanced);
        assert_eq!(labels().count(), 7);
    }
}
