//! Knowledge retrieval seam.
//!
//! Retrieved document chunks are spliced into the system prompt between
//! fixed delimiters. Retrieval is best effort; a failing source never blocks
//! a chat request.

use async_trait::async_trait;

const CONTEXT_HEADER: &str = "\n\n--- CONTEXT FROM USER'S DOCUMENTS ---\n";
const CONTEXT_FOOTER: &str = "\n--- END CONTEXT ---\n\
    Use the above context to inform your answer when relevant. \
    If the context is not relevant to the question, ignore it.\n";

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Chunks relevant to `query`, most relevant first. Empty when nothing
    /// applies or the source is unavailable.
    async fn retrieve(&self, query: &str) -> Vec<String>;
}

/// Source used when no knowledge base is configured.
pub struct NoKnowledge;

#[async_trait]
impl KnowledgeSource for NoKnowledge {
    async fn retrieve(&self, _query: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Persona prompt plus delimited retrieval context, or the bare prompt when
/// nothing was retrieved.
pub fn compose_system_prompt(persona_prompt: &str, chunks: &[String]) -> String {
    if chunks.is_empty() {
        return persona_prompt.to_string();
    }
    format!(
        "{persona_prompt}{CONTEXT_HEADER}{}{CONTEXT_FOOTER}",
        chunks.join("\n---\n")
    )
}
