//! Conversation ledger: token ceiling and cumulative usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default per-conversation token ceiling.
pub const DEFAULT_TOKEN_LIMIT: u32 = 20_000;

pub const DEFAULT_TITLE: &str = "New Conversation";

/// A conversation and its token ledger.
///
/// `total_tokens_used` only moves forward, except through [`reset_usage`]
/// (clear conversation). [`add_tokens`] raises the ceiling and leaves usage
/// untouched. Usage is recorded only for durably stored messages, never from
/// estimates.
///
/// [`reset_usage`]: Conversation::reset_usage
/// [`add_tokens`]: Conversation::add_tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub total_tokens_used: u32,
    pub token_limit: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(token_limit: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_TITLE.to_string(),
            total_tokens_used: 0,
            token_limit,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.token_limit.saturating_sub(self.total_tokens_used)
    }

    pub fn usage_percentage(&self) -> f64 {
        if self.token_limit == 0 {
            return 100.0;
        }
        let pct = (self.total_tokens_used as f64 / self.token_limit as f64) * 100.0;
        pct.min(100.0)
    }

    /// Admission check: would a request of `estimated_tokens` stay within the
    /// ceiling? This is a heuristic gate, not the ledger source of truth.
    pub fn can_send(&self, estimated_tokens: u32) -> bool {
        self.total_tokens_used.saturating_add(estimated_tokens) <= self.token_limit
    }

    /// Record realized token cost after a message is durably stored. May push
    /// usage past the ceiling (a response in flight is always saved in full).
    pub fn record_usage(&mut self, tokens: u32) {
        if tokens > 0 {
            self.total_tokens_used = self.total_tokens_used.saturating_add(tokens);
            self.updated_at = Utc::now();
        }
    }

    /// Raise the ceiling (top-up). Usage is unchanged.
    pub fn add_tokens(&mut self, amount: u32) {
        self.token_limit = self.token_limit.saturating_add(amount);
        self.updated_at = Utc::now();
    }

    /// Reset usage to zero (clear conversation). The ceiling is unchanged.
    pub fn reset_usage(&mut self) {
        self.total_tokens_used = 0;
        self.updated_at = Utc::now();
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            conversation_id: Some(self.id),
            total_tokens_used: self.total_tokens_used,
            token_limit: self.token_limit,
            remaining_tokens: self.remaining_tokens(),
            usage_percentage: self.usage_percentage(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LIMIT)
    }
}

/// Snapshot of a conversation's token headroom, as rendered to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub conversation_id: Option<Uuid>,
    pub total_tokens_used: u32,
    pub token_limit: u32,
    pub remaining_tokens: u32,
    pub usage_percentage: f64,
}

impl TokenUsage {
    /// Usage snapshot for a caller with no conversation yet.
    pub fn empty(token_limit: u32) -> Self {
        Self {
            conversation_id: None,
            total_tokens_used: 0,
            token_limit,
            remaining_tokens: token_limit,
            usage_percentage: 0.0,
        }
    }
}
