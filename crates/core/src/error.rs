//! Error types for the LearnLoop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum.

use thiserror::Error;

/// The top-level error type for all LearnLoop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Language model errors ---
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    // --- Persistence errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Session lookup ---
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the language-model call. Never retried inside the core.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

/// Failures of profile persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write profile for {student_id}: {reason}")]
    WriteFailed { student_id: String, reason: String },

    #[error("Failed to serialize profile for {student_id}: {reason}")]
    SerializeFailed { student_id: String, reason: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_displays_correctly() {
        let err = Error::Generation(GenerationError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn storage_error_displays_student() {
        let err = Error::Storage(StorageError::WriteFailed {
            student_id: "alice".into(),
            reason: "disk full".into(),
        });
        assert!(err.to_string().contains("alice"));
        assert!(err.to_string().contains("disk full"));
    }
}
