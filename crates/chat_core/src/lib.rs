//! Shared domain types and configuration for the chat service.

pub mod config;
pub mod conversation;
pub mod message;

pub use config::Config;
pub use conversation::{Conversation, TokenUsage, DEFAULT_TITLE, DEFAULT_TOKEN_LIMIT};
pub use message::{Message, Role};
