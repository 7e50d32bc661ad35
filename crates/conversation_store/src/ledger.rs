//! Per-conversation write locks.
//!
//! Admission checks and usage write-back form a read-modify-write cycle on
//! the conversation document. Concurrent requests for the same conversation
//! serialize on its ledger lock; requests for different conversations do
//! not contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct ConversationLedger {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for one conversation, created on first use.
    pub fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry after a conversation is deleted.
    pub fn forget(&self, id: Uuid) {
        self.locks.remove(&id);
    }
}
