//! File-backed store: one pretty-printed JSON document per conversation,
//! named by the conversation id, under a configurable base directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chat_core::Conversation;
use tokio::fs;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{ConversationRecord, ConversationStore};

#[derive(Clone)]
pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().join("conversations"),
        }
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, id: Uuid) -> Result<ConversationRecord> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }

        let contents = fs::read_to_string(&path).await?;
        let record: ConversationRecord = serde_json::from_str(&contents)?;
        Ok(record)
    }

    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.record_path(record.conversation.id);
        let contents = serde_json::to_string_pretty(record)?;
        fs::write(&path, contents).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Conversation>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut conversations = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<ConversationRecord>(&contents) {
                Ok(record) => conversations.push(record.conversation),
                Err(err) => {
                    // A corrupt file should not take down the whole listing.
                    log::warn!("skipping unreadable conversation file {path:?}: {err}");
                }
            }
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{Message, DEFAULT_TOKEN_LIMIT};
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_and_load_round_trips_messages() {
        let dir = tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        let mut record = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        record.messages.push(Message::user("hello"));
        store.save(&record).await.unwrap();

        let loaded = store.load(record.conversation.id).await.unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn load_missing_conversation_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        let id = Uuid::new_v4();
        let err = store.load(id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn list_orders_by_most_recent_update() {
        let dir = tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        let older = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        store.save(&older).await.unwrap();

        let mut newer = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        newer.conversation.updated_at = older.conversation.updated_at + chrono::Duration::seconds(5);
        store.save(&newer).await.unwrap();

        let listing = store.list().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, newer.conversation.id);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        let record = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        store.save(&record).await.unwrap();
        store.delete(record.conversation.id).await.unwrap();
        store.delete(record.conversation.id).await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_the_previous_version() {
        let dir = tempdir().unwrap();
        let store = FileConversationStore::new(dir.path());

        let mut record = ConversationRecord::new(Conversation::new(DEFAULT_TOKEN_LIMIT));
        let id = record.conversation.id;
        record.messages.push(Message::user("one"));
        store.save(&record).await.unwrap();

        record.messages.push(Message::assistant("two"));
        record.conversation.record_usage(500);
        store.save(&record).await.unwrap();

        let loaded = store.load(id).await.unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].content, "two");
        assert_eq!(loaded.conversation.total_tokens_used, 500);
    }
}
