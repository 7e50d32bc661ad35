//! Request and response bodies of the HTTP API.

use chat_core::{Conversation, Message, TokenUsage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Omitted on the first message; the service creates a conversation.
    pub conversation_id: Option<Uuid>,
    pub message: String,
    /// Preferred model; the configured default applies when omitted.
    pub model: Option<String>,
    /// Persona key, one of "general", "developer", "creative", "analyst".
    pub persona: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub conversation: Conversation,
    pub user_message: Message,
    pub assistant_message: Message,
    pub token_usage: TokenUsage,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
    pub token_usage: TokenUsage,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub token_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: u32,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<llm_gateway::ModelInfo>,
    pub default_model: String,
}
