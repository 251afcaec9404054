//! The per-message tutoring pipeline.
//!
//! Each call to [`Orchestrator::process`] walks a fixed state machine:
//!
//! ```text
//! CollectingInput → ContextRetrieval → ┬─ TeacherOverride ───────────────────────────┐
//!                                       └─ ToolSelection → Generation → TopicDetection │
//!                                            → ProgressUpdate → SessionUpdate → Complete ←┘
//! ```
//!
//! A turn is all-or-nothing: nothing reaches the session or the profile when
//! generation fails, and the profile is saved before the session records the
//! exchange so a failed save also leaves the session untouched.

use chrono::{DateTime, Utc};
use learnloop_config::AppConfig;
use learnloop_core::error::{Error, Result};
use learnloop_core::event::{DomainEvent, EventBus};
use learnloop_core::message::{Message, SessionId};
use learnloop_core::profile::{Level, Profile, ProfileStore};
use learnloop_core::provider::{Provider, ProviderRequest};
use learnloop_core::tool::{TEACHER_OVERRIDE, ToolKind, WebSearch};
use learnloop_store::FileProfileStore;
use learnloop_tools::analytics::{AnalyticsLog, InteractionRecord};
use learnloop_tools::web_search::{BraveSearch, OfflineSearch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{AssemblyInput, ContextAssembler};
use crate::session::{SessionState, SessionSummary};
use crate::toolbox::{ToolInvocation, ToolOutcome, Toolbox};
use crate::{prompts, topics};

/// Words that suggest the student wants current information.
const SEARCH_TRIGGERS: &[&str] = &[
    "latest",
    "recent",
    "new",
    "current",
    "today",
    "breakthrough",
    "announcement",
    "news",
    "2024",
    "2025",
];

const DEFAULT_OVERRIDE_REASON: &str = "Teacher correction";

/// Decide whether a message should trigger a web search.
pub fn should_search(message: &str, allow_search: bool) -> bool {
    if !allow_search {
        return false;
    }
    let lower = message.to_lowercase();
    SEARCH_TRIGGERS.iter().any(|kw| lower.contains(kw))
}

// ── Types ────────────────────────────────────────────────────────────────

/// Pipeline stage, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    CollectingInput,
    ContextRetrieval,
    TeacherOverride,
    ToolSelection,
    Generation,
    TopicDetection,
    ProgressUpdate,
    SessionUpdate,
    Complete,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::CollectingInput => "collecting_input",
            TurnState::ContextRetrieval => "context_retrieval",
            TurnState::TeacherOverride => "teacher_override",
            TurnState::ToolSelection => "tool_selection",
            TurnState::Generation => "generation",
            TurnState::TopicDetection => "topic_detection",
            TurnState::ProgressUpdate => "progress_update",
            TurnState::SessionUpdate => "session_update",
            TurnState::Complete => "complete",
        }
    }
}

/// A teacher-supplied reply that replaces generation for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeacherOverride {
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Outcome of one processed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub message: String,
    pub tools_used: Vec<String>,
    pub topics_detected: Vec<String>,
    pub level: Level,
    pub progress: u8,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

/// Session plus profile report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub student_id: String,
    pub duration: String,
    pub messages_count: usize,
    pub topics_explored: Vec<String>,
    pub progress: u8,
    pub level: Level,
    pub session_data: SessionSummary,
}

/// Tunables for every orchestrator sharing a runtime.
#[derive(Debug, Clone)]
pub struct TutorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Candidate history messages considered per turn.
    pub history_window: usize,
    /// Session ring-buffer capacity.
    pub max_history: usize,
    pub context_budget: usize,
    pub recent_keep: usize,
    pub prioritize_by_topic: bool,
    pub search_enabled: bool,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl TutorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self {
            model,
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            history_window: config.session.history_window,
            max_history: config.session.max_history,
            context_budget: config.context.max_tokens,
            recent_keep: config.context.recent_keep,
            prioritize_by_topic: config.context.prioritize_by_topic,
            search_enabled: config.search.enabled,
        }
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────

/// Collaborators shared by every orchestrator in the process.
pub struct TutorRuntime {
    provider: Arc<dyn Provider>,
    toolbox: Toolbox,
    events: Arc<EventBus>,
    settings: TutorSettings,
}

impl TutorRuntime {
    pub fn new(
        provider: Arc<dyn Provider>,
        profiles: Arc<dyn ProfileStore>,
        search: Arc<dyn WebSearch>,
        settings: TutorSettings,
    ) -> Self {
        Self {
            provider,
            toolbox: Toolbox::new(search, profiles, Arc::new(AnalyticsLog::new())),
            events: Arc::new(EventBus::default()),
            settings,
        }
    }

    /// Wire the runtime from configuration: the configured default provider,
    /// a file-backed profile store and Brave search (offline when disabled).
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let router = learnloop_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;

        let profiles: Arc<dyn ProfileStore> = Arc::new(FileProfileStore::new(config.profiles_dir()));
        let search: Arc<dyn WebSearch> = if config.search.enabled {
            Arc::new(BraveSearch::from_config(&config.search))
        } else {
            Arc::new(OfflineSearch)
        };

        info!(
            provider = %provider.name(),
            profiles = %profiles.name(),
            search = %search.name(),
            "Tutor runtime ready"
        );

        Ok(Self::new(provider, profiles, search, TutorSettings::from_config(config)))
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Share an analytics log with other runtimes (or the HTTP layer).
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsLog>) -> Self {
        self.toolbox = Toolbox::new(self.toolbox.search().clone(), self.toolbox.profiles().clone(), analytics);
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        self.toolbox.profiles()
    }

    pub fn analytics(&self) -> &Arc<AnalyticsLog> {
        self.toolbox.analytics()
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    /// Count a newly opened session on the student's profile.
    pub async fn open_session(&self, student_id: &str) -> Result<Profile> {
        match self
            .toolbox
            .dispatch(ToolInvocation::SessionStart {
                student_id: student_id.to_string(),
            })
            .await?
        {
            ToolOutcome::Profile(p) => {
                debug!(student = %student_id, sessions = p.total_sessions, "Session counted");
                Ok(p)
            }
            other => Err(Error::Internal(format!("unexpected session start outcome: {other:?}"))),
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────

/// Drives one student's session. Reusable across turns.
pub struct Orchestrator {
    runtime: Arc<TutorRuntime>,
    student_id: String,
    session: SessionState,
}

impl Orchestrator {
    pub fn new(runtime: Arc<TutorRuntime>, student_id: impl Into<String>) -> Self {
        let student_id = student_id.into();
        let session = SessionState::new(student_id.clone(), runtime.settings.max_history, Utc::now());
        Self {
            runtime,
            student_id,
            session,
        }
    }

    /// Resume under a caller-supplied session id.
    pub fn with_session_id(runtime: Arc<TutorRuntime>, student_id: impl Into<String>, session_id: SessionId) -> Self {
        let student_id = student_id.into();
        let session = SessionState::with_id(session_id, student_id.clone(), runtime.settings.max_history, Utc::now());
        Self {
            runtime,
            student_id,
            session,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Process one student message.
    pub async fn process(
        &mut self,
        message: &str,
        allow_search: bool,
        teacher_override: Option<TeacherOverride>,
    ) -> Result<TurnResult> {
        self.enter(TurnState::CollectingInput);
        let profile = self.runtime.profiles().load(&self.student_id).await;
        let inbound = serde_json::json!({
            "message": message,
            "student_level": profile.level(),
            "topics_explored": profile.topics(),
        });
        let received_at = Utc::now();

        self.enter(TurnState::ContextRetrieval);
        let candidates = self.retrieve_history(&profile);

        if let Some(ov) = teacher_override {
            return Ok(self.apply_override(ov, &profile, inbound, received_at));
        }

        self.enter(TurnState::ToolSelection);
        let mut tools_used = Vec::new();
        let mut user_content = message.to_string();
        if should_search(message, allow_search && self.runtime.settings.search_enabled) {
            if let ToolOutcome::SearchResults(results) = self
                .runtime
                .toolbox
                .dispatch(ToolInvocation::Search {
                    query: message.to_string(),
                })
                .await?
            {
                self.runtime.events.publish(DomainEvent::SearchPerformed {
                    query_preview: message.chars().take(50).collect(),
                    timestamp: Utc::now(),
                });
                if !results.is_empty() {
                    user_content.push_str("\n\n[Current Information]: ");
                    user_content.push_str(&results);
                    tools_used.push(ToolKind::WebSearch.name().to_string());
                }
            }
        }

        self.enter(TurnState::Generation);
        let reply = self.generate(&profile, &candidates, message, &user_content).await?;

        self.enter(TurnState::TopicDetection);
        let detected = topics::detect(&reply);
        let topics_detected: Vec<String> = detected.iter().cloned().collect();

        self.enter(TurnState::ProgressUpdate);
        let now = Utc::now();
        let updated = match self
            .runtime
            .toolbox
            .dispatch(ToolInvocation::ProfileUpdate {
                student_id: self.student_id.clone(),
                detected,
                now,
            })
            .await?
        {
            ToolOutcome::Profile(p) => p,
            other => return Err(Error::Internal(format!("unexpected profile update outcome: {other:?}"))),
        };
        self.runtime.events.publish(DomainEvent::ProfileUpdated {
            student_id: self.student_id.clone(),
            level: updated.level().to_string(),
            progress: updated.progress(),
            timestamp: now,
        });

        self.enter(TurnState::SessionUpdate);
        self.session.record_event(inbound, Some(received_at));
        self.session.record_message(Message::user(message).at(received_at));
        self.session
            .record_message(Message::assistant(reply.clone()).with_topics(topics_detected.clone()).at(now));
        self.record_analytics(&topics_detected, &tools_used, now).await;

        self.runtime.events.publish(DomainEvent::TurnCompleted {
            student_id: self.student_id.clone(),
            session_id: self.session.id().to_string(),
            topics: topics_detected.clone(),
            tools_used: tools_used.clone(),
            timestamp: now,
        });

        self.enter(TurnState::Complete);
        info!(
            student = %self.student_id,
            level = %updated.level(),
            progress = updated.progress(),
            topics = topics_detected.len(),
            "Turn complete"
        );

        Ok(TurnResult {
            message: reply,
            tools_used,
            topics_detected,
            level: updated.level(),
            progress: updated.progress(),
            session_id: self.session.id().to_string(),
            timestamp: now,
            override_reason: None,
        })
    }

    /// Session and profile report.
    pub async fn session_summary(&self) -> SessionReport {
        let now = Utc::now();
        let profile = self.runtime.profiles().load(&self.student_id).await;
        let session_data = self.session.summarize(now);

        SessionReport {
            session_id: self.session.id().to_string(),
            student_id: self.student_id.clone(),
            duration: session_data.duration_formatted.clone(),
            messages_count: self.session.message_count(),
            topics_explored: profile.topics().iter().cloned().collect(),
            progress: profile.progress(),
            level: profile.level(),
            session_data,
        }
    }

    /// Start a new session for the same student. The profile is untouched.
    pub fn reset_session(&mut self) -> &SessionId {
        self.session = self.session.reset(Utc::now());
        debug!(session = %self.session.id(), "Session reset");
        self.session.id()
    }

    // ── Stages ───────────────────────────────────────────────────────────

    fn enter(&self, state: TurnState) {
        debug!(state = state.as_str(), student = %self.student_id, session = %self.session.id(), "Turn state");
    }

    fn retrieve_history(&self, profile: &Profile) -> Vec<Message> {
        let settings = &self.runtime.settings;
        let recent = self.session.recent_messages(settings.history_window);
        if !settings.prioritize_by_topic {
            return recent;
        }
        let learned: Vec<&str> = profile.topics().iter().map(String::as_str).collect();
        ContextAssembler::new(settings.context_budget)
            .with_recent_keep(settings.recent_keep)
            .prioritize(&recent, &learned)
    }

    async fn generate(
        &self,
        profile: &Profile,
        candidates: &[Message],
        message: &str,
        user_content: &str,
    ) -> Result<String> {
        let settings = &self.runtime.settings;
        let guidelines = prompts::guidelines_for(message);
        let assembled = ContextAssembler::new(settings.context_budget).build(&AssemblyInput {
            base_prompt: prompts::SYSTEM_PROMPT,
            guidelines: &guidelines,
            profile,
            history: candidates,
            extra: user_content,
        });
        debug!(
            total_tokens = assembled.metadata.total_tokens,
            budget = assembled.metadata.budget,
            included = assembled.metadata.messages_included,
            dropped = assembled.metadata.messages_dropped,
            "Context assembled"
        );

        let mut messages = assembled.messages;
        messages.push(Message::user(user_content));

        let request = ProviderRequest {
            model: settings.model.clone(),
            system: assembled.system_prompt,
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        match self.runtime.provider.complete(request).await {
            Ok(response) => Ok(response.content),
            Err(e) => {
                warn!(provider = %self.runtime.provider.name(), error = %e, "Generation failed");
                self.runtime.events.publish(DomainEvent::ErrorOccurred {
                    context: "generation".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(Error::Generation(e))
            }
        }
    }

    fn apply_override(
        &mut self,
        ov: TeacherOverride,
        profile: &Profile,
        inbound: serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> TurnResult {
        self.enter(TurnState::TeacherOverride);
        let now = Utc::now();
        let reason = ov.reason.unwrap_or_else(|| DEFAULT_OVERRIDE_REASON.to_string());

        self.session.record_event(inbound, Some(received_at));
        self.session
            .record_message(Message::assistant(ov.message.clone()).with_topics(ov.topics.clone()).at(now));

        self.runtime.events.publish(DomainEvent::TeacherOverrideApplied {
            student_id: self.student_id.clone(),
            session_id: self.session.id().to_string(),
            reason: reason.clone(),
            timestamp: now,
        });
        info!(student = %self.student_id, reason = %reason, "Teacher override applied");

        self.enter(TurnState::Complete);
        TurnResult {
            message: ov.message,
            tools_used: vec![TEACHER_OVERRIDE.to_string()],
            topics_detected: ov.topics,
            level: profile.level(),
            progress: profile.progress(),
            session_id: self.session.id().to_string(),
            timestamp: now,
            override_reason: Some(reason),
        }
    }

    async fn record_analytics(&self, topics: &[String], tools_used: &[String], now: DateTime<Utc>) {
        let record = InteractionRecord {
            session_id: self.session.id().to_string(),
            topics: topics.to_vec(),
            tools_used: tools_used.to_vec(),
            timestamp: now,
        };
        let invocation = ToolInvocation::Analytics {
            student_id: self.student_id.clone(),
            record,
        };
        if let Err(e) = self.runtime.toolbox.dispatch(invocation).await {
            warn!(error = %e, "Analytics recording failed");
        }
    }
}
