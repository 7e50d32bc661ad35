//! Model catalog: the static fallback chain, the featured list, and the
//! remote model listing with an explicit TTL cache.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Backup models tried, in order, when the requested model fails. A mix of
/// fast, cheap, and free models for maximum availability.
pub const FALLBACK_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-001",
    "openai/gpt-4o-mini",
    "meta-llama/llama-4-scout",
    "deepseek/deepseek-chat-v3-0324",
    "mistralai/mistral-small-3.1-24b-instruct",
    "google/gemma-3-12b-it:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "mistralai/mistral-nemo:free",
    "qwen/qwen-2.5-72b-instruct:free",
    "google/gemma-3-27b-it:free",
    "deepseek/deepseek-r1-distill-llama-70b:free",
];

/// Models pinned to the top of the selector.
pub const FEATURED_MODELS: &[(&str, &str)] = &[
    ("openai/gpt-4o", "GPT-4o"),
    ("openai/gpt-4o-mini", "GPT-4o Mini"),
    ("anthropic/claude-sonnet-4", "Claude Sonnet 4"),
    ("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet"),
    ("google/gemini-2.0-flash-001", "Gemini 2.0 Flash"),
    ("google/gemini-2.5-pro-preview", "Gemini 2.5 Pro"),
    ("deepseek/deepseek-chat-v3-0324", "DeepSeek V3"),
    ("deepseek/deepseek-r1", "DeepSeek R1"),
    ("meta-llama/llama-4-maverick", "Llama 4 Maverick"),
    ("meta-llama/llama-4-scout", "Llama 4 Scout"),
    ("mistralai/mistral-large-2411", "Mistral Large"),
    ("qwen/qwen-2.5-coder-32b-instruct", "Qwen 2.5 Coder 32B"),
];

/// Display metadata for one model. Only `id` matters to orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub context_length: u32,
    pub is_free: bool,
    pub featured: bool,
    pub pricing: ModelPricing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per 1M prompt tokens, display string.
    pub prompt: String,
    /// Cost per 1M completion tokens, display string.
    pub completion: String,
}

/// Cached model listing with an explicit time-to-live. Held by the serving
/// component and passed around by reference; deliberately not a process-wide
/// singleton.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub value: Vec<ModelInfo>,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl ModelCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    pub fn new(value: Vec<ModelInfo>, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

// --- Remote listing payloads ---

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<RemoteModel>,
}

#[derive(Debug, Deserialize)]
struct RemoteModel {
    id: String,
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u32>,
    pricing: Option<RemotePricing>,
}

#[derive(Debug, Deserialize)]
struct RemotePricing {
    /// USD per prompt token, as a decimal string.
    prompt: Option<String>,
    completion: Option<String>,
}

/// Fetches and curates the provider's model listing.
pub struct ModelCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl ModelCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn fetch(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::Request(format!(
                "model listing failed: HTTP {status}"
            )));
        }

        let listing: ModelsResponse = response.json().await?;
        let mut models: Vec<ModelInfo> = listing.data.into_iter().map(curate).collect();

        // Featured first, then provider family, then name.
        models.sort_by(|a, b| {
            (!a.featured, &a.provider, &a.name).cmp(&(!b.featured, &b.provider, &b.name))
        });

        Ok(models)
    }
}

fn curate(model: RemoteModel) -> ModelInfo {
    let prompt_cost = model
        .pricing
        .as_ref()
        .and_then(|p| p.prompt.as_deref())
        .and_then(|p| p.parse::<f64>().ok())
        .map(|per_token| per_token * 1_000_000.0);
    let completion_cost = model
        .pricing
        .as_ref()
        .and_then(|p| p.completion.as_deref())
        .and_then(|p| p.parse::<f64>().ok())
        .map(|per_token| per_token * 1_000_000.0);

    let is_free = matches!((prompt_cost, completion_cost), (Some(p), Some(c)) if p == 0.0 && c == 0.0);

    ModelInfo {
        provider: provider_family(&model.id).to_string(),
        name: model.name.unwrap_or_else(|| model.id.clone()),
        context_length: model.context_length.unwrap_or(0),
        is_free,
        featured: FEATURED_MODELS.iter().any(|(id, _)| *id == model.id),
        pricing: ModelPricing {
            prompt: format_cost(prompt_cost),
            completion: format_cost(completion_cost),
        },
        id: model.id,
    }
}

fn format_cost(cost_per_million: Option<f64>) -> String {
    match cost_per_million {
        Some(cost) => format!("${cost:.2}/1M"),
        None => "N/A".to_string(),
    }
}

fn provider_family(model_id: &str) -> &'static str {
    match model_id.split('/').next().unwrap_or("") {
        "openai" => "openai",
        "anthropic" => "anthropic",
        "google" => "google",
        "meta-llama" => "meta",
        "mistralai" => "mistral",
        "deepseek" => "deepseek",
        "cohere" => "cohere",
        "qwen" => "qwen",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn fallback_list_has_no_duplicates() {
        for (i, model) in FALLBACK_MODELS.iter().enumerate() {
            assert!(!FALLBACK_MODELS[i + 1..].contains(model));
        }
    }

    #[test]
    fn provider_family_is_derived_from_id_prefix() {
        assert_eq!(provider_family("openai/gpt-4o"), "openai");
        assert_eq!(provider_family("meta-llama/llama-4-scout"), "meta");
        assert_eq!(provider_family("unknown-vendor/model"), "other");
    }

    #[test]
    fn fresh_cache_expires_after_ttl() {
        let cache = ModelCache::new(vec![], Duration::from_secs(600));
        assert!(cache.is_fresh());

        let expired = ModelCache {
            value: vec![],
            fetched_at: Instant::now() - Duration::from_secs(601),
            ttl: Duration::from_secs(600),
        };
        assert!(!expired.is_fresh());
    }

    #[test]
    fn curate_marks_free_and_featured_models() {
        let model = RemoteModel {
            id: "openai/gpt-4o-mini".into(),
            name: Some("GPT-4o Mini".into()),
            context_length: Some(128_000),
            pricing: Some(RemotePricing {
                prompt: Some("0".into()),
                completion: Some("0".into()),
            }),
        };
        let info = curate(model);
        assert!(info.is_free);
        assert!(info.featured);
        assert_eq!(info.pricing.prompt, "$0.00/1M");
    }

    #[test]
    fn curate_without_pricing_shows_na() {
        let model = RemoteModel {
            id: "x/y".into(),
            name: None,
            context_length: None,
            pricing: None,
        };
        let info = curate(model);
        assert!(!info.is_free);
        assert_eq!(info.pricing.prompt, "N/A");
        assert_eq!(info.name, "x/y");
    }

    #[tokio::test]
    async fn fetch_sorts_featured_models_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "zz/unfeatured", "name": "ZZ" },
                    { "id": "openai/gpt-4o", "name": "GPT-4o",
                      "context_length": 128000,
                      "pricing": { "prompt": "0.0000025", "completion": "0.00001" } }
                ]
            })))
            .mount(&server)
            .await;

        let models = ModelCatalog::new(server.uri()).fetch().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "openai/gpt-4o");
        assert!(models[0].featured);
        assert_eq!(models[0].pricing.prompt, "$2.50/1M");
    }

    #[tokio::test]
    async fn fetch_maps_server_error_to_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = ModelCatalog::new(server.uri()).fetch().await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
