//! Tutoring REST API.
//!
//! Endpoints:
//!
//! - `GET  /api/health`                 : Liveness and active session count
//! - `POST /api/message`                : Process a student message
//! - `POST /api/teacher/override`       : Replace the tutor reply for a live session
//! - `GET  /api/session/{id}/summary`   : Session and profile report
//! - `POST /api/session/{id}/end`       : End a session
//! - `GET  /api/student/{id}/profile`   : Learning history and recommendations
//! - `GET  /api/student/{id}/analytics` : Progress summary and learning graph
//! - `GET  /api/topics`                 : Topic catalogue
//! - `GET  /api/knowledge/{topic}`      : Curated lesson (`?level=`, default Beginner)
//!
//! Errors are returned as `{"detail": "..."}`.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use learnloop_agent::progress::{LearningHistory, Recommendation, recommendations};
use learnloop_agent::topics::{CatalogueEntry, catalogue};
use learnloop_agent::{SessionReport, TeacherOverride, TurnResult};
use learnloop_agent::{ToolInvocation, ToolOutcome};
use learnloop_core::error::Error;
use learnloop_core::profile::Level;
use learnloop_tools::analytics::{LearningGraph, ProgressSummary};
use learnloop_tools::knowledge_base::KnowledgeEntry;

use crate::SharedState;

// ── Router ────────────────────────────────────────────────────────────────

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/message", post(message_handler))
        .route("/api/teacher/override", post(override_handler))
        .route("/api/session/{id}/summary", get(session_summary_handler))
        .route("/api/session/{id}/end", post(end_session_handler))
        .route("/api/student/{id}/profile", get(profile_handler))
        .route("/api/student/{id}/analytics", get(analytics_handler))
        .route("/api/topics", get(topics_handler))
        .route("/api/knowledge/{topic}", get(knowledge_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// An error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::Generation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::NOT_FOUND {
            error!(error = %e, "Request failed");
        }
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub active_sessions: usize,
    pub provider_configured: bool,
    pub uptime_secs: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub student_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_true")]
    pub allow_web_search: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub student_id: String,
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub status: String,
    pub session_id: String,
    pub summary: Option<SessionReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub history: LearningHistory,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub student_id: String,
    pub progress_summary: ProgressSummary,
    pub learning_graph: LearningGraph,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<CatalogueEntry>,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeQuery {
    #[serde(default = "default_level")]
    pub level: Level,
}

fn default_level() -> Level {
    Level::Beginner
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy".into(),
        service: "learnloop".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        active_sessions: state.registry.len().await,
        provider_configured: state.provider_configured,
        uptime_secs: (now - state.start_time).num_seconds(),
        timestamp: now,
    })
}

/// `POST /api/message`: route a student message through the tutor.
async fn message_handler(State(state): State<SharedState>, Json(payload): Json<MessageRequest>) -> ApiResult<TurnResult> {
    info!(
        student = %payload.student_id,
        session = ?payload.session_id,
        message_len = payload.message.len(),
        "Message received"
    );

    let (orchestrator, _) = state
        .registry
        .get_or_create(&payload.student_id, payload.session_id.as_deref())
        .await?;
    let mut orchestrator = orchestrator.lock().await;
    let result = orchestrator
        .process(&payload.message, payload.allow_web_search, None)
        .await?;
    Ok(Json(result))
}

/// `POST /api/teacher/override`: only for a session that is already live.
async fn override_handler(State(state): State<SharedState>, Json(payload): Json<OverrideRequest>) -> ApiResult<TurnResult> {
    let orchestrator = state
        .registry
        .find_by_session(&payload.session_id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    let mut orchestrator = orchestrator.lock().await;
    if orchestrator.student_id() != payload.student_id {
        return Err(ApiError::not_found("Session not found"));
    }

    let teacher_override = TeacherOverride {
        message: payload.message,
        reason: payload.reason,
        topics: payload.topics,
    };
    let result = orchestrator.process("", false, Some(teacher_override)).await?;
    Ok(Json(result))
}

async fn session_summary_handler(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult<SessionReport> {
    let orchestrator = state
        .registry
        .find_by_session(&id)
        .await
        .ok_or_else(|| ApiError::from(Error::SessionNotFound(id.clone())))?;
    let report = orchestrator.lock().await.session_summary().await;
    Ok(Json(report))
}

async fn end_session_handler(State(state): State<SharedState>, Path(id): Path<String>) -> Json<EndSessionResponse> {
    let summary = match state.registry.end(&id).await {
        Some(orchestrator) => Some(orchestrator.lock().await.session_summary().await),
        None => None,
    };
    Json(EndSessionResponse {
        status: "session_ended".into(),
        session_id: id,
        summary,
    })
}

async fn profile_handler(State(state): State<SharedState>, Path(id): Path<String>) -> Json<ProfileResponse> {
    let profile = state.runtime().profiles().load(&id).await;
    Json(ProfileResponse {
        history: LearningHistory::from_profile(&profile, Utc::now()),
        recommendations: recommendations(&profile),
    })
}

async fn analytics_handler(State(state): State<SharedState>, Path(id): Path<String>) -> Json<AnalyticsResponse> {
    let analytics = state.runtime().analytics();
    Json(AnalyticsResponse {
        progress_summary: analytics.progress_summary(&id).await,
        learning_graph: analytics.learning_graph(&id).await,
        student_id: id,
        timestamp: Utc::now(),
    })
}

async fn topics_handler() -> Json<TopicsResponse> {
    Json(TopicsResponse { topics: catalogue() })
}

/// `GET /api/knowledge/{topic}`: lesson content written for the given level.
async fn knowledge_handler(
    State(state): State<SharedState>,
    Path(topic): Path<String>,
    Query(query): Query<KnowledgeQuery>,
) -> ApiResult<KnowledgeEntry> {
    let outcome = state
        .runtime()
        .toolbox()
        .dispatch(ToolInvocation::KnowledgeBase {
            topic,
            level: query.level,
        })
        .await?;
    match outcome {
        ToolOutcome::Content(Some(entry)) => Ok(Json(entry)),
        _ => Err(ApiError::not_found("Content not found")),
    }
}
