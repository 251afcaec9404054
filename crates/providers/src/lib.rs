//! LLM Provider implementations for LearnLoop.
//!
//! All providers implement the `learnloop_core::Provider` trait.
//! The router selects the correct provider based on configuration.

use learnloop_core::GenerationError;
use std::time::Duration;

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};

/// Upper bound on one provider call. Also set on every request, so the
/// fallback client below stays bounded.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client with a request timeout. Falls back to reqwest defaults if the
/// builder fails (no TLS backend, for instance).
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a transport failure onto the generation error taxonomy.
pub(crate) fn map_send_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else {
        GenerationError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stalled_request_maps_to_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let err = http_client()
            .get(format!("http://{addr}/v1/models"))
            .timeout(Duration::from_millis(100))
            .send()
            .await
            .unwrap_err();
        assert!(matches!(map_send_error(err), GenerationError::Timeout(_)));
        server.abort();
    }
}
