//! Session registry: live orchestrators keyed by session id.
//!
//! Each orchestrator sits behind its own `tokio::sync::Mutex`, so one
//! student/session pair handles one message at a time while different pairs
//! run concurrently.

use learnloop_core::error::{Error, Result};
use learnloop_core::message::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::orchestrator::{Orchestrator, TutorRuntime};

pub type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

/// A live orchestrator and the student it was opened for.
struct LiveSession {
    student_id: String,
    orchestrator: SharedOrchestrator,
}

pub struct SessionRegistry {
    runtime: Arc<TutorRuntime>,
    sessions: RwLock<HashMap<String, LiveSession>>,
}

impl SessionRegistry {
    pub fn new(runtime: Arc<TutorRuntime>) -> Self {
        Self {
            runtime,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &Arc<TutorRuntime> {
        &self.runtime
    }

    /// Existing orchestrator for `session_id`, or a new one.
    ///
    /// Without a session id a fresh session is always started. An unknown id
    /// starts a session under that id. A live session belonging to another
    /// student is reported as `SessionNotFound`. Opening a session counts it
    /// on the student's profile. Returns the orchestrator and its session id.
    pub async fn get_or_create(&self, student_id: &str, session_id: Option<&str>) -> Result<(SharedOrchestrator, String)> {
        if let Some(id) = session_id {
            if let Some(existing) = self.find_owned(student_id, id).await? {
                return Ok((existing, id.to_string()));
            }
        }

        let orchestrator = match session_id {
            Some(id) => Orchestrator::with_session_id(self.runtime.clone(), student_id, SessionId::from(id)),
            None => Orchestrator::new(self.runtime.clone(), student_id),
        };
        let id = orchestrator.session_id().to_string();

        let (entry, opened) = {
            let mut sessions = self.sessions.write().await;
            // Another request may have created it while we were unlocked
            let opened = !sessions.contains_key(&id);
            let live = sessions.entry(id.clone()).or_insert_with(|| LiveSession {
                student_id: student_id.to_string(),
                orchestrator: Arc::new(Mutex::new(orchestrator)),
            });
            if live.student_id != student_id {
                return Err(reject(student_id, &id));
            }
            let entry = live.orchestrator.clone();
            if opened {
                info!(student = %student_id, session = %id, active = sessions.len(), "Session opened");
            }
            (entry, opened)
        };

        if opened {
            self.runtime.open_session(student_id).await?;
        }
        Ok((entry, id))
    }

    /// Live orchestrator for `session_id`, whoever owns it.
    pub async fn find_by_session(&self, session_id: &str) -> Option<SharedOrchestrator> {
        self.sessions.read().await.get(session_id).map(|s| s.orchestrator.clone())
    }

    async fn find_owned(&self, student_id: &str, session_id: &str) -> Result<Option<SharedOrchestrator>> {
        match self.sessions.read().await.get(session_id) {
            Some(live) if live.student_id == student_id => Ok(Some(live.orchestrator.clone())),
            Some(_) => Err(reject(student_id, session_id)),
            None => Ok(None),
        }
    }

    /// Remove a session, returning its orchestrator if it was live.
    pub async fn end(&self, session_id: &str) -> Option<SharedOrchestrator> {
        let removed = self.sessions.write().await.remove(session_id);
        if removed.is_some() {
            info!(session = %session_id, "Session ended");
        }
        removed.map(|s| s.orchestrator)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn reject(student_id: &str, session_id: &str) -> Error {
    warn!(student = %student_id, session = %session_id, "Session belongs to another student");
    Error::SessionNotFound(session_id.to_string())
}
