//! Conversation persistence: an async storage trait with a file-backed
//! implementation (one JSON document per conversation) and an in-memory
//! implementation for tests, plus a per-conversation write lock so usage
//! accounting stays consistent under concurrent requests.

pub mod error;
pub mod file_store;
pub mod ledger;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use file_store::FileConversationStore;
pub use ledger::ConversationLedger;
pub use memory::InMemoryConversationStore;
pub use store::{ConversationRecord, ConversationStore, SharedStore};
