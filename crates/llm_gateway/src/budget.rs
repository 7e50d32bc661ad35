//! Budget admission.
//!
//! The gate runs before any network call and before the user's turn is
//! recorded with a nonzero cost. It is a heuristic: after a response returns,
//! the realized token counts are what enter the ledger, and a single request
//! is allowed to overdraft the ceiling (a model cannot be stopped
//! mid-generation).

use chat_core::Conversation;

pub struct BudgetGate;

impl BudgetGate {
    /// `used + estimated <= ceiling`.
    pub fn can_admit(used: u32, ceiling: u32, estimated: u32) -> bool {
        used.saturating_add(estimated) <= ceiling
    }

    /// Admission check against a conversation's ledger.
    pub fn admit(conversation: &Conversation, estimated: u32) -> bool {
        Self::can_admit(
            conversation.total_tokens_used,
            conversation.token_limit,
            estimated,
        )
    }
}
