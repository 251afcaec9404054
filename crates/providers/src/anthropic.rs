//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field

use async_trait::async_trait;
use learnloop_core::error::GenerationError;
use learnloop_core::message::{Message, Role};
use learnloop_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{REQUEST_TIMEOUT, http_client, map_send_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http_client(),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert messages to Anthropic API format.
    ///
    /// System messages are folded into the top-level `system` field by the
    /// caller, so they are dropped here.
    fn to_api_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Join the request's system prompt with any inline system messages.
    fn system_prompt(request: &ProviderRequest) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if !request.system.is_empty() {
            parts.push(&request.system);
        }
        for m in request.messages.iter().filter(|m| m.role == Role::System) {
            parts.push(&m.content);
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Convert Anthropic API response to our ProviderResponse.
    fn response_to_provider_response(
        resp: AnthropicResponse,
    ) -> std::result::Result<ProviderResponse, GenerationError> {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(ProviderResponse {
            content: text,
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured(
                "No Anthropic API key. Set ANTHROPIC_API_KEY or run `learnloop onboard`".into(),
            ));
        }

        let url = format!("{}/v1/messages", self.base_url);
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
        });

        if let Some(system) = Self::system_prompt(&request) {
            body["system"] = serde_json::json!(system);
        }

        debug!(
            provider = "anthropic",
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(GenerationError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse Anthropic response: {e}"),
                })?;

        Self::response_to_provider_response(api_resp)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, GenerationError> {
        // No listing endpoint in use; return known models
        Ok(vec![
            "claude-sonnet-4-20250514".into(),
            "claude-opus-4-20250514".into(),
            "claude-3-5-haiku-20241022".into(),
        ])
    }

    async fn health_check(&self) -> std::result::Result<bool, GenerationError> {
        if self.api_key.is_empty() {
            return Ok(false);
        }

        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": "claude-3-5-haiku-20241022",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_send_error)?;

        // 401 = bad key, anything else means reachable
        Ok(response.status().as_u16() != 401)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: &str, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "claude-sonnet-4-20250514".into(),
            system: system.into(),
            messages,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test")
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn system_prompt_merges_inline_system_messages() {
        let req = request(
            "You are a tutor",
            vec![Message::system("Be concise"), Message::user("Hello")],
        );
        assert_eq!(
            AnthropicProvider::system_prompt(&req).as_deref(),
            Some("You are a tutor\n\nBe concise")
        );
        assert!(AnthropicProvider::system_prompt(&request("", vec![])).is_none());
    }

    #[test]
    fn message_conversion_drops_system() {
        let messages = vec![
            Message::system("sys"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];
        let api_msgs = AnthropicProvider::to_api_messages(&messages);
        assert_eq!(api_msgs.len(), 2);
        assert_eq!(api_msgs[0].role, "user");
        assert_eq!(api_msgs[1].role, "assistant");
    }

    #[test]
    fn response_conversion_joins_text_blocks() {
        let resp: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "Machine learning is"},
                {"type": "text", "text": "learning from data."}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 6}
        }))
        .unwrap();

        let out = AnthropicProvider::response_to_provider_response(resp).unwrap();
        assert_eq!(out.content, "Machine learning is\nlearning from data.");
        assert_eq!(out.usage.unwrap().total_tokens, 16);
    }

    #[test]
    fn empty_response_is_error() {
        let resp: AnthropicResponse = serde_json::from_value(serde_json::json!({
            "model": "m",
            "content": [{"type": "thinking", "thinking": "hmm"}],
            "usage": {"input_tokens": 1, "output_tokens": 0}
        }))
        .unwrap();
        assert!(matches!(
            AnthropicProvider::response_to_provider_response(resp),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = AnthropicProvider::new("");
        let err = provider
            .complete(request("sys", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
        assert!(!provider.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn known_models_listed() {
        let models = AnthropicProvider::new("k").list_models().await.unwrap();
        assert!(models.contains(&"claude-sonnet-4-20250514".to_string()));
    }
}
