//! Completion orchestration: token estimation, context assembly, budget
//! admission, and model fallback with retry for both blocking and streaming
//! completion calls.

pub mod budget;
pub mod catalog;
pub mod context;
pub mod error;
pub mod estimator;
pub mod openrouter;
pub mod orchestrator;
pub mod title;
pub mod transport;

pub use budget::BudgetGate;
pub use catalog::{ModelCache, ModelCatalog, ModelInfo, FALLBACK_MODELS};
pub use context::ContextBuilder;
pub use error::{OrchestratorError, ProviderError};
pub use estimator::{HeuristicEstimator, SharedEstimator, TokenEstimator};
pub use openrouter::OpenRouterTransport;
pub use orchestrator::{CompletionOrchestrator, FallbackChain, RetryPolicy};
pub use title::TitleGenerator;
pub use transport::{
    Completion, CompletionRequest, CompletionTransport, StreamEvent, StreamSummary, TokenStream,
};
