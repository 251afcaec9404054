//! End-to-end integration tests for the LearnLoop tutoring pipeline.
//!
//! These tests exercise the full path from a student message to the persisted
//! profile: context assembly, search, generation, topic detection, progress
//! and session recording.

use std::sync::Arc;

use async_trait::async_trait;
use learnloop_agent::{Orchestrator, SessionRegistry, TeacherOverride, TutorRuntime, TutorSettings, should_search};
use learnloop_core::error::{Error, GenerationError};
use learnloop_core::profile::{Level, ProfileStore};
use learnloop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use learnloop_core::tool::WebSearch;
use learnloop_store::{FileProfileStore, InMemoryProfileStore};
use learnloop_tools::web_search::OfflineSearch;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<Result<String, GenerationError>>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses),
            requests: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, GenerationError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let n = requests.len();
        if n >= responses.len() {
            panic!("ScriptedProvider exhausted: call #{}, have {}", n, responses.len());
        }
        requests.push(request);
        let content = responses[n].clone()?;
        Ok(ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

fn runtime_with(
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn ProfileStore>,
    settings: TutorSettings,
) -> Arc<TutorRuntime> {
    Arc::new(TutorRuntime::new(provider, store, Arc::new(OfflineSearch), settings))
}

fn runtime(provider: Arc<ScriptedProvider>, store: Arc<dyn ProfileStore>) -> Arc<TutorRuntime> {
    runtime_with(provider, store, TutorSettings::default())
}

// ── Learning progression ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_beginner_to_intermediate_persists() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::texts(&[
        "Neural networks are a kind of machine learning.",
        "Computer vision, the ethics of bias, and chatbots.",
    ]);
    let store: Arc<dyn ProfileStore> = Arc::new(FileProfileStore::new(dir.path()));
    let mut tutor = Orchestrator::new(runtime(provider.clone(), store), "maya");

    let first = tutor.process("Tell me about AI", false, None).await.unwrap();
    assert_eq!(first.progress, 10);
    assert_eq!(first.level, Level::Beginner);
    assert_eq!(first.topics_detected, vec!["Machine Learning", "Neural Networks"]);

    let second = tutor.process("What else is there?", false, None).await.unwrap();
    assert_eq!(second.progress, 25);
    assert_eq!(second.level, Level::Intermediate);
    assert_eq!(second.topics_detected.len(), 3);

    // A fresh store on the same directory sees the saved profile
    let reopened = FileProfileStore::new(dir.path());
    let profile = reopened.load("maya").await;
    assert_eq!(profile.progress(), 25);
    assert_eq!(profile.topics().len(), 5);
    assert_eq!(profile.total_questions, 2);
    assert_eq!(profile.level(), Level::Intermediate);

    // The second request carried the first exchange as history
    let contents: Vec<String> = provider.request(1).messages.iter().map(|m| m.content.clone()).collect();
    assert_eq!(
        contents,
        vec![
            "Tell me about AI".to_string(),
            "Neural networks are a kind of machine learning.".to_string(),
            "What else is there?".to_string(),
        ]
    );
    assert!(provider.request(1).system.contains("- Progress: 10%"));
}

#[tokio::test]
async fn e2e_repeated_topics_keep_growing_progress() {
    let provider = ScriptedProvider::texts(&["ethics", "ethics", "ethics"]);
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let mut tutor = Orchestrator::new(runtime(provider, store.clone()), "lee");

    let mut last = 0;
    for _ in 0..3 {
        let r = tutor.process("again?", false, None).await.unwrap();
        assert!(r.progress > last);
        last = r.progress;
    }
    let profile = store.load("lee").await;
    assert_eq!(profile.topics().len(), 1);
    assert_eq!(profile.progress(), 15);
    // One topic never leaves Beginner
    assert_eq!(profile.level(), Level::Beginner);
}

// ── Teacher override ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_teacher_override_bypasses_everything() {
    let provider = ScriptedProvider::texts(&[]);
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let before = store.load("sam").await;
    let rt = runtime(provider.clone(), store.clone());
    let mut tutor = Orchestrator::new(rt.clone(), "sam");

    let result = tutor
        .process(
            "any news on transformers?",
            true,
            Some(TeacherOverride {
                message: "Let's revisit attention first.".into(),
                reason: Some("Prerequisite missing".into()),
                topics: vec!["Neural Networks".into()],
            }),
        )
        .await
        .unwrap();

    assert_eq!(provider.calls(), 0);
    assert_eq!(result.message, "Let's revisit attention first.");
    assert_eq!(result.tools_used, vec!["teacher_override"]);
    assert_eq!(result.override_reason.as_deref(), Some("Prerequisite missing"));
    assert_eq!(store.load("sam").await, before);
    assert_eq!(rt.analytics().interactions("sam").await, 0);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["override_reason"], "Prerequisite missing");
}

// ── Search ───────────────────────────────────────────────────────────────

#[test]
fn e2e_should_search_examples() {
    assert!(should_search("What's the latest in machine learning?", true));
    assert!(should_search("Tell me about TODAY's announcement", true));
    assert!(should_search("Any breakthroughs in 2024?", true));
    assert!(!should_search("What is machine learning?", true));
    assert!(!should_search("latest news", false));
}

#[tokio::test]
async fn e2e_offline_search_feeds_prompt() {
    let provider = ScriptedProvider::texts(&["Here is what changed."]);
    let mut tutor = Orchestrator::new(runtime(provider.clone(), Arc::new(InMemoryProfileStore::new())), "kai");

    let result = tutor
        .process("latest generative ai news", true, None)
        .await
        .unwrap();
    assert_eq!(result.tools_used, vec!["web_search"]);

    let expected = OfflineSearch.query("latest generative ai news").await;
    let sent = provider.request(0).messages.last().unwrap().content.clone();
    assert_eq!(sent, format!("latest generative ai news\n\n[Current Information]: {expected}"));
}

#[tokio::test]
async fn e2e_search_disabled_in_settings() {
    let provider = ScriptedProvider::texts(&["ok"]);
    let settings = TutorSettings {
        search_enabled: false,
        ..TutorSettings::default()
    };
    let mut tutor = Orchestrator::new(
        runtime_with(provider, Arc::new(InMemoryProfileStore::new()), settings),
        "ola",
    );
    let result = tutor.process("latest news", true, None).await.unwrap();
    assert!(result.tools_used.is_empty());
}

// ── Context budget ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_tight_budget_drops_history() {
    let provider = ScriptedProvider::texts(&["first", "second"]);
    let settings = TutorSettings {
        context_budget: 10,
        ..TutorSettings::default()
    };
    let mut tutor = Orchestrator::new(
        runtime_with(provider.clone(), Arc::new(InMemoryProfileStore::new()), settings),
        "pat",
    );
    tutor.process("one", false, None).await.unwrap();
    tutor.process("two", false, None).await.unwrap();

    // The system prompt alone is over budget, so only the current message goes out
    let req = provider.request(1);
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.messages[0].content, "two");
    assert!(!req.system.is_empty());
}

// ── Failure atomicity ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_generation_error_leaves_state_untouched() {
    let provider = ScriptedProvider::new(vec![Err(GenerationError::RateLimited { retry_after_secs: 5 })]);
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let mut tutor = Orchestrator::new(runtime(provider, store.clone()), "ray");

    let err = tutor.process("What is NLP?", false, None).await.unwrap_err();
    assert!(matches!(err, Error::Generation(GenerationError::RateLimited { .. })));
    assert!(err.to_string().contains("retry after 5s"));
    assert_eq!(tutor.session().message_count(), 0);
    assert_eq!(store.load("ray").await.total_questions, 0);
}

// ── Concurrency ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_concurrent_sessions_share_profile_safely() {
    let replies: Vec<&str> = vec!["machine learning"; 10];
    let provider = ScriptedProvider::texts(&replies);
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let registry = Arc::new(SessionRegistry::new(runtime(provider, store.clone())));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let (tutor, _) = registry.get_or_create("zed", None).await.unwrap();
            tutor.lock().await.process("hi", false, None).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let profile = store.load("zed").await;
    assert_eq!(profile.total_questions, 10);
    assert_eq!(profile.total_sessions, 10);
    assert_eq!(profile.progress(), 50);
    assert_eq!(registry.len().await, 10);
}
