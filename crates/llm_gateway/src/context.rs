//! Token-bounded context assembly.
//!
//! Selects which slice of conversation history goes to the model. Two
//! messages are mandatory regardless of budget pressure: a leading system
//! instruction (if present) and the final user turn (the message currently
//! being answered). The rest of the history is filled newest-first, a whole
//! message at a time.

use chat_core::{Message, Role};
use log::debug;

use crate::estimator::TokenEstimator;

pub struct ContextBuilder<'a> {
    estimator: &'a dyn TokenEstimator,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(estimator: &'a dyn TokenEstimator) -> Self {
        Self { estimator }
    }

    /// Build the outbound message list so its estimated cost fits within
    /// `budget - reserve`.
    ///
    /// Rules:
    /// - the last message is always included, even when it alone overdrafts
    ///   the budget (truncation must never drop the turn being answered);
    /// - a leading system message is always included;
    /// - remaining history is scanned newest-to-oldest and included greedily,
    ///   stopping at the first message that does not fit; messages are atomic
    ///   (never split);
    /// - output preserves original chronological order.
    ///
    /// Returns an empty list when `budget - reserve <= 0` (nothing can be
    /// sent at all) or when `messages` is empty.
    pub fn build(&self, messages: &[Message], budget: u32, reserve: u32) -> Vec<Message> {
        let available = budget.saturating_sub(reserve);
        if available == 0 {
            return Vec::new();
        }
        let Some(last) = messages.last() else {
            return Vec::new();
        };

        let system = messages
            .first()
            .filter(|m| m.role == Role::System && messages.len() > 1);

        let last_cost = self.estimator.estimate_message(last);
        let system_cost = system.map(|m| self.estimator.estimate_message(m)).unwrap_or(0);

        // Overdraft tolerated for the mandatory set: saturates to 0 rather
        // than rejecting.
        let mut remaining = available.saturating_sub(last_cost + system_cost);

        let history = if system.is_some() {
            &messages[1..messages.len() - 1]
        } else {
            &messages[..messages.len() - 1]
        };

        let mut included: Vec<&Message> = Vec::new();
        for message in history.iter().rev() {
            let cost = self.estimator.estimate_message(message);
            if cost <= remaining {
                included.push(message);
                remaining -= cost;
            } else {
                break;
            }
        }

        let mut result = Vec::with_capacity(included.len() + 2);
        if let Some(system) = system {
            result.push(system.clone());
        }
        // Newest-first scan, chronological output.
        result.extend(included.into_iter().rev().cloned());
        result.push(last.clone());

        debug!(
            "context built: {} of {} messages, ~{} tokens left of {}",
            result.len(),
            messages.len(),
            remaining,
            available
        );

        result
    }
}
