//! Storage trait and the on-disk record shape.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{Conversation, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Everything persisted for one conversation. Messages live inside the
/// conversation document rather than in a separate table; conversations are
/// small and always read whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationRecord {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            messages: Vec::new(),
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load one conversation with its messages.
    async fn load(&self, id: Uuid) -> Result<ConversationRecord>;

    /// Persist a conversation record, replacing any previous version.
    async fn save(&self, record: &ConversationRecord) -> Result<()>;

    /// All conversations (without messages), most recently updated first.
    async fn list(&self) -> Result<Vec<Conversation>>;

    /// Remove a conversation and its messages. Deleting a missing
    /// conversation is not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Messages of one conversation in chronological order.
    async fn messages(&self, id: Uuid) -> Result<Vec<Message>> {
        Ok(self.load(id).await?.messages)
    }
}

pub type SharedStore = Arc<dyn ConversationStore>;
