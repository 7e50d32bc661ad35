use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chat_core::TokenUsage;
use llm_gateway::OrchestratorError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Admission denied: the estimated cost would push the conversation over
    /// its token ceiling. Carries the usage snapshot so clients can render
    /// the budget state without a second request.
    #[error("Token limit exceeded for this conversation")]
    BudgetExceeded { usage: TokenUsage },

    #[error("Conversation not found: {0}")]
    ConversationNotFound(uuid::Uuid),

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("{0}")]
    Provider(#[from] OrchestratorError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<conversation_store::StoreError> for AppError {
    fn from(err: conversation_store::StoreError) -> Self {
        match err {
            conversation_store::StoreError::NotFound(id) => AppError::ConversationNotFound(id),
            other => AppError::Storage(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_usage: Option<TokenUsage>,
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::BudgetExceeded { .. } => "budget_exceeded",
            AppError::ConversationNotFound(_) => "not_found",
            AppError::EmptyMessage => "invalid_request",
            AppError::Provider(OrchestratorError::Auth(_)) => "provider_auth",
            AppError::Provider(OrchestratorError::AllProvidersExhausted { .. }) => {
                "providers_exhausted"
            }
            AppError::Storage(_) | AppError::Internal(_) => "api_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BudgetExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyMessage => StatusCode::BAD_REQUEST,
            AppError::Provider(OrchestratorError::Auth(_)) => StatusCode::BAD_GATEWAY,
            AppError::Provider(OrchestratorError::AllProvidersExhausted { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let token_usage = match self {
            AppError::BudgetExceeded { usage } => Some(usage.clone()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
            },
            token_usage,
        })
    }
}
