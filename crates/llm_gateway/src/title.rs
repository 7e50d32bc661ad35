//! Best-effort conversation title generation.
//!
//! Titles are cosmetic: a single low-budget completion on the preferred
//! model, no retries, no fallback chain, and a syntactic truncation of the
//! user's message when the model is unavailable.

use std::sync::Arc;

use chat_core::Message;
use log::debug;

use crate::transport::{CompletionRequest, CompletionTransport};

const TITLE_MAX_TOKENS: u32 = 20;
const TITLE_FALLBACK_CHARS: usize = 50;

pub struct TitleGenerator {
    transport: Arc<dyn CompletionTransport>,
    model: String,
}

impl TitleGenerator {
    pub fn new(transport: Arc<dyn CompletionTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    /// Produce a title for a conversation opened with `first_message`.
    /// Infallible: any provider failure degrades to [`fallback_title`].
    pub async fn generate(&self, first_message: &str) -> String {
        let prompt = format!(
            "Generate a short (max 5 words) conversation title for: '{first_message}'. \
             Respond ONLY with the title."
        );
        let request = CompletionRequest::new(
            self.model.clone(),
            vec![Message::user(prompt)],
            TITLE_MAX_TOKENS,
        );

        match self.transport.complete(&request).await {
            Ok(completion) => {
                let title = sanitize_title(&completion.text);
                if title.is_empty() {
                    fallback_title(first_message)
                } else {
                    title
                }
            }
            Err(err) => {
                debug!("title generation failed, using truncation: {err}");
                fallback_title(first_message)
            }
        }
    }
}

/// First line of the model output, stripped of surrounding quotes and
/// trailing punctuation.
fn sanitize_title(raw: &str) -> String {
    let line = raw.lines().next().unwrap_or("").trim();
    let line = line.trim_matches(|c| c == '"' || c == '\'' || c == '\u{201c}' || c == '\u{201d}');
    line.trim_end_matches(['.', ':']).trim().to_string()
}

/// Truncation of the user's message at a word boundary, used when no model
/// answer is available.
pub fn fallback_title(message: &str) -> String {
    let message = message.trim();
    if message.chars().count() <= TITLE_FALLBACK_CHARS {
        return message.to_string();
    }

    let head: String = message.chars().take(TITLE_FALLBACK_CHARS).collect();
    let cut = head.rfind(' ').unwrap_or(head.len());
    format!("{}...", head[..cut].trim_end())
}
