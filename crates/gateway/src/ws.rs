//! Live chat over WebSocket.
//!
//! `GET /ws/chat/{student_id}` opens a fresh session for the student and
//! keeps it for the life of the connection.
//!
//! Protocol:
//! - Client → Server: `{ "message": "...", "allow_web_search": true }`
//! - Server → Client: `{ "type": "message", "data": TurnResult }` followed by
//!   `{ "type": "progress", "data": { "progress", "level", "topics" } }`, or
//!   `{ "type": "error", "data": { "message": "..." } }` when a turn fails.
//!
//! Blank messages are ignored. The session ends when the socket closes.

use axum::{
    Router,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use learnloop_agent::{SharedOrchestrator, TurnResult};
use learnloop_core::profile::Level;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{GatewayState, SharedState};

pub fn ws_router(state: SharedState) -> Router {
    Router::new()
        .route("/ws/chat/{student_id}", get(ws_chat_handler))
        .with_state(state)
}

/// A chat message from the client.
#[derive(Debug, Deserialize)]
struct WsClientMessage {
    #[serde(default)]
    message: String,
    #[serde(default = "default_true")]
    allow_web_search: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressFrame {
    pub progress: u8,
    pub level: Level,
    pub topics: Vec<String>,
}

/// One server → client frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsFrame {
    Message(TurnResult),
    Progress(ProgressFrame),
    Error { message: String },
}

async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    Path(student_id): Path<String>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat(socket, state, student_id))
}

async fn handle_chat(mut socket: WebSocket, state: SharedState, student_id: String) {
    let (orchestrator, session_id) = match state.registry.get_or_create(&student_id, None).await {
        Ok(opened) => opened,
        Err(e) => {
            let _ = send_frame(&mut socket, &WsFrame::Error { message: e.to_string() }).await;
            return;
        }
    };
    info!(student = %student_id, session = %session_id, "WebSocket chat connected");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "WebSocket receive failed");
                break;
            }
        };

        for frame in turn_frames(&state, &orchestrator, text.as_str()).await {
            if send_frame(&mut socket, &frame).await.is_err() {
                break;
            }
        }
    }

    state.registry.end(&session_id).await;
    info!(student = %student_id, session = %session_id, "WebSocket chat closed");
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).unwrap_or_default();
    socket.send(WsMessage::Text(json.into())).await
}

/// Frames answering one raw client text.
pub(crate) async fn turn_frames(state: &GatewayState, orchestrator: &SharedOrchestrator, raw: &str) -> Vec<WsFrame> {
    let client: WsClientMessage = match serde_json::from_str(raw) {
        Ok(m) => m,
        Err(e) => {
            return vec![WsFrame::Error {
                message: format!("Invalid message: {e}"),
            }];
        }
    };
    if client.message.trim().is_empty() {
        return Vec::new();
    }

    let mut orchestrator = orchestrator.lock().await;
    match orchestrator.process(&client.message, client.allow_web_search, None).await {
        Ok(result) => {
            let profile = state.runtime().profiles().load(orchestrator.student_id()).await;
            vec![
                WsFrame::Message(result),
                WsFrame::Progress(ProgressFrame {
                    progress: profile.progress(),
                    level: profile.level(),
                    topics: profile.topics().iter().cloned().collect(),
                }),
            ]
        }
        Err(e) => {
            warn!(student = %orchestrator.student_id(), error = %e, "WebSocket turn failed");
            vec![WsFrame::Error { message: e.to_string() }]
        }
    }
}
