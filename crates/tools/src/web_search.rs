//! Web search backends.
//!
//! `BraveSearch` calls the Brave Search API with a bounded timeout.
//! `OfflineSearch` returns canned results so the tutor works without
//! network access. Any Brave failure degrades to the offline results.

use async_trait::async_trait;
use learnloop_core::tool::WebSearch;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const MAX_FORMATTED: usize = 5;

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(default = "no_title")]
    pub title: String,
    #[serde(default = "no_description", rename = "description")]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
}

fn no_title() -> String {
    "No title".into()
}
fn no_description() -> String {
    "No description".into()
}

/// Render hits as numbered title/snippet/source lines for the prompt.
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No recent information found.".into();
    }

    let mut out = String::from("Recent information from the web:\n\n");
    for (i, hit) in hits.iter().take(MAX_FORMATTED).enumerate() {
        out.push_str(&format!(
            "{}. {}\n   {}\n   Source: {}\n\n",
            i + 1,
            hit.title,
            hit.snippet,
            hit.url
        ));
    }
    out
}

// ── Offline ──────────────────────────────────────────────────────────────

/// Canned results keyed by topic phrase.
pub struct OfflineSearch;

impl OfflineSearch {
    const GENERIC: &'static str = "Current information: AI continues to advance rapidly in 2024-2025 with improvements in efficiency, accessibility, and capabilities across all domains.";

    pub fn results_for(query: &str) -> String {
        let q = query.to_lowercase();

        let canned: [(&str, SearchHit); 3] = [
            (
                "machine learning",
                SearchHit {
                    title: "Latest Advances in Machine Learning - 2024".into(),
                    snippet: "Recent developments include improved efficiency in training large models, federated learning for privacy, and AutoML advancements.".into(),
                    url: "https://ai-research.example.com/ml-2024".into(),
                },
            ),
            (
                "neural networks",
                SearchHit {
                    title: "Transformer Architecture Evolution".into(),
                    snippet: "Modern neural networks have evolved beyond traditional architectures with attention mechanisms and efficient transformers.".into(),
                    url: "https://ai-research.example.com/transformers".into(),
                },
            ),
            (
                "generative ai",
                SearchHit {
                    title: "Generative AI in 2024: State of the Art".into(),
                    snippet: "Large language models and diffusion models continue to advance, with improved controllability and reduced computational costs.".into(),
                    url: "https://ai-research.example.com/genai-2024".into(),
                },
            ),
        ];

        for (key, hit) in canned {
            if q.contains(key) {
                return format_results(&[hit]);
            }
        }

        Self::GENERIC.to_string()
    }
}

#[async_trait]
impl WebSearch for OfflineSearch {
    fn name(&self) -> &str {
        "offline"
    }

    async fn query(&self, text: &str) -> String {
        Self::results_for(text)
    }
}

// ── Brave ────────────────────────────────────────────────────────────────

/// Brave Search API client. Without an API key it behaves as `OfflineSearch`.
pub struct BraveSearch {
    api_key: Option<String>,
    base_url: String,
    num_results: usize,
    timeout: Duration,
    client: reqwest::Client,
}

impl BraveSearch {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default search client");
                reqwest::Client::new()
            });
        // `fetch` also sets the timeout per request, so the fallback is bounded too.

        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.into(),
            num_results: MAX_FORMATTED,
            timeout,
            client,
        }
    }

    /// Build from the `[search]` config section.
    pub fn from_config(config: &learnloop_config::SearchConfig) -> Self {
        Self::new(config.api_key.clone(), Duration::from_secs(config.timeout_secs))
            .with_base_url(&config.base_url)
            .with_num_results(config.num_results)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_num_results(mut self, n: usize) -> Self {
        self.num_results = n.max(1);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, api_key: &str, query: &str) -> Result<Vec<SearchHit>, String> {
        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[("q", query), ("count", &self.num_results.to_string())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status.as_u16()));
        }

        let body: BraveResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.web.map(|w| w.results).unwrap_or_default())
    }
}

#[async_trait]
impl WebSearch for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    async fn query(&self, text: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return OfflineSearch::results_for(text);
        };

        match self.fetch(api_key, text).await {
            Ok(hits) => {
                debug!(hits = hits.len(), "Brave search returned");
                format_results(&hits)
            }
            Err(e) => {
                warn!(error = %e, "Brave search failed, using offline results");
                OfflineSearch::results_for(text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<SearchHit>,
}
