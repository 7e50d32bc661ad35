//! In-memory store used by service tests.

use async_trait::async_trait;
use chat_core::Conversation;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{ConversationRecord, ConversationStore};

#[derive(Default)]
pub struct InMemoryConversationStore {
    records: DashMap<Uuid, ConversationRecord>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, id: Uuid) -> Result<ConversationRecord> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        self.records.insert(record.conversation.id, record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .records
            .iter()
            .map(|entry| entry.conversation.clone())
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.records.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{Message, DEFAULT_TOKEN_LIMIT};

    #[tokio::test]
    async fn behaves_like_a_store() {
        let store = InMemoryConversationStore::new();
        let record = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        let id = record.conversation.id;

        store.save(&record).await.unwrap();

        let mut updated = store.load(id).await.unwrap();
        updated.messages.push(Message::user("ping"));
        store.save(&updated).await.unwrap();

        assert_eq!(store.messages(id).await.unwrap().len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete(id).await.unwrap();
        assert!(matches!(
            store.load(id).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
