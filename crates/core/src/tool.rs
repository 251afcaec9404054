//! The closed set of tutor tools.
//!
//! Tools are not model-invoked here: the orchestrator decides when each one
//! runs. Every tool still carries an MCP-style definition so the set can be
//! advertised to clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Marker placed in `tools_used` when a teacher override replaced the reply.
pub const TEACHER_OVERRIDE: &str = "teacher_override";

/// Tool definition (name, description, JSON Schema for inputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Every tool the tutor can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    ProfileUpdate,
    Analytics,
    KnowledgeBase,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::WebSearch,
        ToolKind::ProfileUpdate,
        ToolKind::Analytics,
        ToolKind::KnowledgeBase,
    ];

    /// Name reported in `tools_used`.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::ProfileUpdate => "profile_update",
            ToolKind::Analytics => "analytics_update",
            ToolKind::KnowledgeBase => "knowledge_base",
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        let (description, parameters) = match self {
            ToolKind::WebSearch => (
                "Search the web for current information about AI topics",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolKind::ProfileUpdate => (
                "Update a student's learning profile with newly covered topics",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "student_id": { "type": "string" },
                        "topics": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Topic labels detected in the exchange"
                        }
                    },
                    "required": ["student_id", "topics"]
                }),
            ),
            ToolKind::Analytics => (
                "Record a learning interaction for progress analytics",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "student_id": { "type": "string" },
                        "session_id": { "type": "string" },
                        "topics": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "tools_used": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["student_id", "session_id"]
                }),
            ),
            ToolKind::KnowledgeBase => (
                "Retrieve curated educational content from knowledge base",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "topic": {
                            "type": "string",
                            "description": "Topic identifier"
                        },
                        "level": {
                            "type": "string",
                            "description": "Student level",
                            "enum": ["Beginner", "Intermediate", "Advanced"],
                            "default": "Beginner"
                        }
                    },
                    "required": ["topic"]
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Web search capability.
///
/// Never fails: implementations return a human-readable fallback text when
/// the backend is unreachable or unconfigured.
#[async_trait]
pub trait WebSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, text: &str) -> String;
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
