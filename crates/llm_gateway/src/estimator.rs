//! Token estimation.
//!
//! Heuristic estimation (chars/4) stands in until a real tokenizer is wired
//! in behind the same trait. Counts are an approximation for budgeting, not a
//! billing-grade metric; callers must not depend on the exact constant.

use std::sync::Arc;

use chat_core::Message;

/// Per-message framing overhead: roles and message boundaries cost tokens on
/// top of the content itself.
pub const MESSAGE_OVERHEAD: u32 = 4;

pub trait TokenEstimator: Send + Sync {
    /// Estimate tokens in a plain text string. Empty text estimates to 0;
    /// any non-empty text estimates to at least 1.
    fn estimate_text(&self, text: &str) -> u32;

    /// Estimate tokens for a full message, including framing overhead.
    /// Prefers the message's recorded cost when one is known.
    fn estimate_message(&self, message: &Message) -> u32 {
        if message.tokens_used > 0 {
            return message.tokens_used;
        }
        self.estimate_text(&message.content) + MESSAGE_OVERHEAD
    }

    fn estimate_messages(&self, messages: &[Message]) -> u32 {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

/// Character-count based estimator: `max(1, chars / 4)` for non-empty text.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEstimator {}

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self {}
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as u32;
        (chars / 4).max(1)
    }
}

/// Arc-wrapped estimator for sharing across the pipeline.
pub type SharedEstimator = Arc<dyn TokenEstimator>;
