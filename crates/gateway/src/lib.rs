//! HTTP API gateway for LearnLoop.
//!
//! Exposes the tutoring REST endpoints under `/api`: send a message, teacher
//! override, session summary and end, student profile and analytics, topic
//! catalogue, knowledge base and health. Live chat runs over a WebSocket at
//! `/ws/chat/{student_id}`.
//!
//! Built on Axum. Sessions live in a [`SessionRegistry`] injected through the
//! router state; nothing is global.

pub mod api;
pub mod ws;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use learnloop_agent::{SessionRegistry, TutorRuntime};
use learnloop_core::event::DomainEvent;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub registry: SessionRegistry,
    pub provider_configured: bool,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(runtime: Arc<TutorRuntime>, provider_configured: bool) -> Self {
        Self {
            registry: SessionRegistry::new(runtime),
            provider_configured,
            start_time: chrono::Utc::now(),
        }
    }

    pub fn runtime(&self) -> &Arc<TutorRuntime> {
        self.registry.runtime()
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - Permissive CORS for browser clients
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    api::api_router(state.clone())
        .merge(ws::ws_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: learnloop_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let runtime = Arc::new(TutorRuntime::from_config(&config)?);
    tokio::spawn(log_events(runtime.events().subscribe()));
    let state = Arc::new(GatewayState::new(runtime, config.has_api_key()));
    let app = build_router(state);

    info!(addr = %addr, provider = %config.default_provider, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Trace every domain event until the bus is dropped. Returns how many
/// events were logged.
pub async fn log_events(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> usize {
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                logged += 1;
                match event.as_ref() {
                    DomainEvent::TurnCompleted {
                        student_id,
                        session_id,
                        topics,
                        tools_used,
                        ..
                    } => info!(
                        student = %student_id,
                        session = %session_id,
                        topics = ?topics,
                        tools = ?tools_used,
                        "event: turn_completed"
                    ),
                    DomainEvent::ProfileUpdated {
                        student_id,
                        level,
                        progress,
                        ..
                    } => info!(student = %student_id, level = %level, progress, "event: profile_updated"),
                    DomainEvent::TeacherOverrideApplied {
                        student_id,
                        session_id,
                        reason,
                        ..
                    } => info!(
                        student = %student_id,
                        session = %session_id,
                        reason = %reason,
                        "event: teacher_override_applied"
                    ),
                    DomainEvent::SearchPerformed { query_preview, .. } => {
                        debug!(query = %query_preview, "event: search_performed")
                    }
                    DomainEvent::ErrorOccurred {
                        context, error_message, ..
                    } => warn!(context = %context, error = %error_message, "event: error_occurred"),
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
    logged
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use learnloop_agent::TutorSettings;
    use learnloop_core::error::GenerationError;
    use learnloop_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use learnloop_store::InMemoryProfileStore;
    use learnloop_tools::web_search::OfflineSearch;

    /// Replies with fixed text, or fails authentication when `None`.
    pub(crate) struct MockProvider {
        pub(crate) response_text: Option<String>,
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, GenerationError> {
            match &self.response_text {
                Some(text) => Ok(ProviderResponse {
                    content: text.clone(),
                    usage: None,
                    model: "mock-model".into(),
                }),
                None => Err(GenerationError::AuthenticationFailed("bad key".into())),
            }
        }
    }

    pub(crate) fn test_state(reply: Option<&str>) -> SharedState {
        let runtime = TutorRuntime::new(
            Arc::new(MockProvider {
                response_text: reply.map(str::to_string),
            }),
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(OfflineSearch),
            TutorSettings::default(),
        );
        Arc::new(GatewayState::new(Arc::new(runtime), true))
    }
}
