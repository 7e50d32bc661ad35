//! Model fallback and retry: the completion orchestration state machine.
//!
//! One orchestrated request walks an ordered chain of candidate models. Each
//! model gets a bounded retry loop for capacity failures; other failure kinds
//! either advance the chain immediately or abort the whole request. The first
//! model to succeed short-circuits the chain.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures_util::StreamExt;
use log::{info, warn};

use crate::error::{OrchestratorError, ProviderError};
use crate::transport::{
    Completion, CompletionRequest, CompletionTransport, StreamEvent, StreamSummary,
};

/// Per-model retry behavior for capacity failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per model before the chain advances.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `initial_backoff * 2^n`.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt)
    }
}

/// Ordered candidate models for one request: the preferred model first, then
/// the static backup list with duplicates removed.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    models: Vec<String>,
}

impl FallbackChain {
    pub fn build(preferred: &str, backups: &[&str]) -> Self {
        let mut models = vec![preferred.to_string()];
        for backup in backups {
            if !models.iter().any(|m| m == backup) {
                models.push((*backup).to_string());
            }
        }
        Self { models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// What a classified failure means for the chain traversal.
enum ChainStep {
    /// Wait, then retry the same model.
    RetrySameModel,
    /// Give up on this model, try the next one now.
    AdvanceChain,
    /// Invalid credentials; no model can succeed.
    Fatal,
}

fn classify(err: &ProviderError) -> ChainStep {
    match err {
        ProviderError::Auth(_) => ChainStep::Fatal,
        ProviderError::Capacity(_) => ChainStep::RetrySameModel,
        // Bad requests, empty responses, and anything unclassified: a
        // model-specific problem, not worth burning retry budget on.
        ProviderError::Request(_)
        | ProviderError::EmptyResponse(_)
        | ProviderError::Stream(_)
        | ProviderError::Http(_)
        | ProviderError::Json(_) => ChainStep::AdvanceChain,
    }
}

pub struct CompletionOrchestrator {
    transport: Arc<dyn CompletionTransport>,
    backup_models: Vec<String>,
    retry: RetryPolicy,
}

impl CompletionOrchestrator {
    pub fn new(transport: Arc<dyn CompletionTransport>, backup_models: Vec<String>) -> Self {
        Self {
            transport,
            backup_models,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chain_for(&self, preferred: &str) -> FallbackChain {
        let backups: Vec<&str> = self.backup_models.iter().map(String::as_str).collect();
        FallbackChain::build(preferred, &backups)
    }

    /// Blocking completion across the fallback chain.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, OrchestratorError> {
        let chain = self.chain_for(&request.model);
        let mut last_error: Option<ProviderError> = None;

        for (index, model) in chain.models().iter().enumerate() {
            if index > 0 {
                info!("falling back to model '{model}'");
            }
            let attempt_request = request_for_model(request, model);

            'attempts: for attempt in 0..self.retry.max_attempts {
                match self.transport.complete(&attempt_request).await {
                    Ok(completion) => {
                        if index > 0 {
                            info!("fallback to '{model}' succeeded");
                        }
                        return Ok(completion);
                    }
                    Err(err) => match classify(&err) {
                        ChainStep::Fatal => return Err(err.into()),
                        ChainStep::RetrySameModel => {
                            let wait = self.retry.backoff_for(attempt);
                            warn!(
                                "rate limit on '{model}' (attempt {}/{}), retrying in {wait:?}",
                                attempt + 1,
                                self.retry.max_attempts
                            );
                            last_error = Some(err);
                            tokio::time::sleep(wait).await;
                        }
                        ChainStep::AdvanceChain => {
                            warn!("model '{model}' failed: {err}, trying next model");
                            last_error = Some(err);
                            break 'attempts;
                        }
                    },
                }
            }
        }

        Err(exhausted(last_error))
    }

    /// Streaming completion with the same chain and retry semantics.
    ///
    /// The returned stream emits zero or more `Token` events and exactly one
    /// terminal `Done` or `Error` event. Once the first fragment has been
    /// delivered, the attempt is committed: a mid-stream failure surfaces as
    /// a terminal `Error` and already-delivered text stays valid; no fallback
    /// model replaces a partially delivered answer.
    pub fn stream(&self, request: CompletionRequest) -> EventStream {
        let transport = Arc::clone(&self.transport);
        let retry = self.retry.clone();
        let chain = self.chain_for(&request.model);

        let stream = async_stream::stream! {
            let mut last_error: Option<ProviderError> = None;

            'models: for (index, model) in chain.models().iter().enumerate() {
                if index > 0 {
                    info!("stream falling back to model '{model}'");
                }
                let attempt_request = request_for_model(&request, model);

                'attempts: for attempt in 0..retry.max_attempts {
                    let mut fragments = match transport.stream(&attempt_request).await {
                        Ok(fragments) => fragments,
                        Err(err) => match classify(&err) {
                            ChainStep::Fatal => {
                                yield StreamEvent::Error { message: err.to_string() };
                                return;
                            }
                            ChainStep::RetrySameModel => {
                                let wait = retry.backoff_for(attempt);
                                warn!(
                                    "stream rate limit on '{model}' (attempt {}/{}), retrying in {wait:?}",
                                    attempt + 1,
                                    retry.max_attempts
                                );
                                last_error = Some(err);
                                tokio::time::sleep(wait).await;
                                continue 'attempts;
                            }
                            ChainStep::AdvanceChain => {
                                warn!("stream on '{model}' failed: {err}, trying next model");
                                last_error = Some(err);
                                continue 'models;
                            }
                        },
                    };

                    let mut text = String::new();
                    let mut delivered = false;

                    loop {
                        match fragments.next().await {
                            Some(Ok(fragment)) => {
                                delivered = true;
                                text.push_str(&fragment);
                                yield StreamEvent::Token { content: fragment };
                            }
                            Some(Err(err)) if delivered => {
                                // Committed: partial output cannot be
                                // silently discarded and replaced.
                                warn!("stream on '{model}' broke after {} chars: {err}", text.len());
                                yield StreamEvent::Error { message: err.to_string() };
                                return;
                            }
                            Some(Err(err)) => match classify(&err) {
                                ChainStep::Fatal => {
                                    yield StreamEvent::Error { message: err.to_string() };
                                    return;
                                }
                                ChainStep::RetrySameModel => {
                                    let wait = retry.backoff_for(attempt);
                                    warn!(
                                        "stream rate limit on '{model}' (attempt {}/{}), retrying in {wait:?}",
                                        attempt + 1,
                                        retry.max_attempts
                                    );
                                    last_error = Some(err);
                                    tokio::time::sleep(wait).await;
                                    continue 'attempts;
                                }
                                ChainStep::AdvanceChain => {
                                    warn!("stream on '{model}' failed: {err}, trying next model");
                                    last_error = Some(err);
                                    continue 'models;
                                }
                            },
                            None if delivered => {
                                yield StreamEvent::Done {
                                    summary: StreamSummary {
                                        text,
                                        prompt_tokens: None,
                                        completion_tokens: None,
                                    },
                                };
                                return;
                            }
                            None => {
                                // Stream ended without a single fragment.
                                let err = ProviderError::EmptyResponse(format!(
                                    "model '{model}' streamed no content"
                                ));
                                warn!("{err}, trying next model");
                                last_error = Some(err);
                                continue 'models;
                            }
                        }
                    }
                }
            }

            yield StreamEvent::Error {
                message: exhausted(last_error).to_string(),
            };
        };

        Box::pin(stream)
    }
}

fn request_for_model(request: &CompletionRequest, model: &str) -> CompletionRequest {
    let mut request = request.clone();
    request.model = model.to_string();
    request
}

fn exhausted(last_error: Option<ProviderError>) -> OrchestratorError {
    OrchestratorError::AllProvidersExhausted {
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no models in chain".to_string()),
    }
}
