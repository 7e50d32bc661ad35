//! Error taxonomy for provider transports and the orchestrator.

use thiserror::Error;

/// Failure of a single provider call, classified so the retry/fallback
/// dispatcher can match exhaustively on the kind.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Invalid or missing credentials. Fatal for the whole chain: a bad key
    /// invalidates every model equally.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limit or capacity exhaustion. Retryable on the same model with
    /// backoff, then the chain advances.
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// The provider rejected the request (unknown model, malformed body).
    /// Not retried; the chain advances immediately.
    #[error("Request error: {0}")]
    Request(String),

    /// A response with no usable content. Handled like [`Request`].
    ///
    /// [`Request`]: ProviderError::Request
    #[error("Empty or unreadable response: {0}")]
    EmptyResponse(String),

    /// Stream decoding failure after the stream was established.
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether this failure warrants another attempt on the same model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Capacity(_))
    }

    /// Whether this failure invalidates the whole chain.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Final outcome of an orchestrated request, after retry and fallback have
/// been exhausted. Per-model failures never surface individually.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Surfaced immediately, unfiltered, without trying further models.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Every model in the chain failed. Capacity failures are typically
    /// transient and global, so the advice to callers is to retry later.
    #[error("All models are currently unavailable. Please wait and try again. (last error: {last_error})")]
    AllProvidersExhausted { last_error: String },
}

impl From<ProviderError> for OrchestratorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Auth(msg) => OrchestratorError::Auth(msg),
            other => OrchestratorError::AllProvidersExhausted {
                last_error: other.to_string(),
            },
        }
    }
}
