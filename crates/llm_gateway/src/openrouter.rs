//! OpenRouter transport (OpenAI-compatible chat completions API).

use async_trait::async_trait;
use chat_core::Message;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ProviderError, Result};
use crate::transport::{Completion, CompletionRequest, CompletionTransport, TokenStream};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub struct OpenRouterTransport {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    referer: String,
    app_title: String,
}

impl OpenRouterTransport {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: "http://localhost:3000".to_string(),
            app_title: "Chat Service".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = title.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProviderError::Auth(
                    "API key not configured. Set OPENROUTER_API_KEY in the environment.".into(),
                )
            })
    }

    async fn post_completions(&self, body: &Value) -> Result<Response> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_status(status, &text))
    }
}

/// Map an HTTP error status to the failure taxonomy.
fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Auth(format!(
            "Authentication failed (HTTP {status}): {body}. Check the API key."
        )),
        429 => ProviderError::Capacity(format!("Rate limited (HTTP 429): {body}")),
        400 | 404 | 422 => ProviderError::Request(format!("HTTP {status}: {body}")),
        _ => ProviderError::Request(format!("HTTP {status}: {body}")),
    }
}

/// Serialize messages as the wire expects: role and content only, empty
/// content dropped.
fn messages_to_wire_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

fn build_request_body(request: &CompletionRequest, stream: bool) -> Value {
    json!({
        "model": request.model,
        "messages": messages_to_wire_json(&request.messages),
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "stream": stream,
    })
}

// --- Response payloads ---

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Extract the text fragment from one SSE data payload. `Ok(None)` means the
/// payload carries nothing to emit (keep-alive, role delta, `[DONE]`).
fn parse_stream_data(data: &str) -> Result<Option<String>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    // OpenRouter interleaves ": comment" keep-alives; eventsource-stream
    // already strips those, but be tolerant of empty chunks.
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ProviderError::Stream(format!("bad stream chunk: {e}")))?;
    let fragment = chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.clone())
        .filter(|c| !c.is_empty());
    Ok(fragment)
}

#[async_trait]
impl CompletionTransport for OpenRouterTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = build_request_body(request, false);
        let response = self.post_completions(&body).await?;

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::EmptyResponse(format!(
                    "model '{}' returned no content",
                    request.model
                ))
            })?;

        let (prompt_tokens, completion_tokens) = match parsed.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (None, None),
        };

        Ok(Completion {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        let body = build_request_body(request, true);
        let response = self.post_completions(&body).await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| {
                let event = event.map_err(|e| ProviderError::Stream(e.to_string()))?;
                parse_stream_data(&event.data)
            })
            .filter_map(|result| async move {
                match result {
                    Ok(Some(fragment)) => Some(Ok(fragment)),
                    Ok(None) => None,
                    Err(err) => Some(Err(err)),
                }
            });

        Ok(Box::pin(stream))
    }
}
