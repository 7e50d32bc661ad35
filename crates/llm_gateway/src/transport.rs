//! Provider transport abstraction.
//!
//! A transport speaks to one completion API. The orchestrator composes a
//! transport with the fallback chain and retry policy; transports themselves
//! do a single attempt and classify failures.

use std::pin::Pin;

use async_trait::async_trait;
use chat_core::Message;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One completion request as it goes over the wire. Messages carry only role
/// and content; internal fields (ids, timestamps, recorded costs) never leak
/// to the provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature: 0.7,
        }
    }
}

/// A complete (non-streamed) model response.
///
/// Token counts are `None` when the provider omitted usage data; callers
/// fall back to the estimator.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Terminal summary of a finished stream. The concatenation of all emitted
/// fragments is the authoritative response text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSummary {
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Events delivered to streaming callers: zero or more `Token`s followed by
/// exactly one terminal `Done` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { content: String },
    Done { summary: StreamSummary },
    Error { message: String },
}

/// Stream of raw text fragments from a single provider attempt.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Perform one blocking completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Open one streaming completion call. An `Err` here means the stream was
    /// never established; errors after establishment arrive as stream items.
    async fn stream(&self, request: &CompletionRequest) -> Result<TokenStream>;
}
