//! The chat pipeline: admission, context assembly, orchestrated completion,
//! persistence, and usage write-back, for both blocking and streaming sends.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use chat_core::{Conversation, Message};
use conversation_store::{ConversationLedger, ConversationRecord, SharedStore};
use futures_util::{Stream, StreamExt};
use llm_gateway::{
    BudgetGate, CompletionOrchestrator, CompletionRequest, ContextBuilder, SharedEstimator,
    StreamEvent, TitleGenerator,
};
use log::{error, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::dto::{SendMessageRequest, SendMessageResponse};
use crate::error::{AppError, Result};
use crate::services::knowledge::{compose_system_prompt, KnowledgeSource};
use crate::services::persona::Persona;

/// Headroom added to the estimated prompt cost at admission, covering the
/// response the model is about to produce.
const ADMISSION_RESERVE: u32 = 500;

/// Tokens held back from the context window for the response.
const RESPONSE_RESERVE: u32 = 1_000;

const MAX_COMPLETION_TOKENS: u32 = 4_000;

/// JSON payloads for the streaming response, one per SSE data frame.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

pub struct ChatService {
    store: SharedStore,
    ledger: Arc<ConversationLedger>,
    orchestrator: Arc<CompletionOrchestrator>,
    titles: Arc<TitleGenerator>,
    knowledge: Arc<dyn KnowledgeSource>,
    estimator: SharedEstimator,
    default_model: String,
    default_token_limit: u32,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SharedStore,
        ledger: Arc<ConversationLedger>,
        orchestrator: Arc<CompletionOrchestrator>,
        titles: Arc<TitleGenerator>,
        knowledge: Arc<dyn KnowledgeSource>,
        estimator: SharedEstimator,
        default_model: String,
        default_token_limit: u32,
    ) -> Self {
        Self {
            store,
            ledger,
            orchestrator,
            titles,
            knowledge,
            estimator,
            default_model,
            default_token_limit,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Blocking send: the full response comes back in one body.
    pub async fn send(&self, request: SendMessageRequest) -> Result<SendMessageResponse> {
        let prepared = self.prepare(&request).await?;
        let _guard = prepared.guard;
        let mut record = prepared.record;
        let user_message = prepared.user_message;

        let completion = self
            .orchestrator
            .complete(&CompletionRequest::new(
                prepared.model,
                prepared.context,
                MAX_COMPLETION_TOKENS,
            ))
            .await?;

        let completion_tokens = completion
            .completion_tokens
            .unwrap_or_else(|| self.estimator.estimate_text(&completion.text));
        let assistant_message = Message::assistant(&completion.text).with_tokens(completion_tokens);
        record.messages.push(assistant_message.clone());
        record.conversation.record_usage(completion_tokens);

        self.maybe_title(&mut record, &request.message).await;
        self.store.save(&record).await?;

        Ok(SendMessageResponse {
            success: true,
            token_usage: record.conversation.usage(),
            conversation: record.conversation,
            user_message,
            assistant_message,
        })
    }

    /// Streaming send. Admission and persistence of the user message happen
    /// before this returns, so budget and not-found failures surface as
    /// plain HTTP errors; everything after the stream opens arrives as
    /// events. The assistant message is persisted when the stream finishes,
    /// including the partial text of a stream that failed mid-response.
    pub async fn send_streaming(&self, request: SendMessageRequest) -> Result<ChatEventStream> {
        let prepared = self.prepare(&request).await?;

        let store = Arc::clone(&self.store);
        let estimator = Arc::clone(&self.estimator);
        let titles = Arc::clone(&self.titles);
        let upstream = self.orchestrator.stream(CompletionRequest::new(
            prepared.model,
            prepared.context,
            MAX_COMPLETION_TOKENS,
        ));
        let guard = prepared.guard;
        let mut record = prepared.record;
        let user_message = prepared.user_message;
        let first_user_text = request.message.clone();

        let events = stream! {
            let _guard = guard;
            let mut fragments = String::new();
            let mut upstream = upstream;

            while let Some(event) = upstream.next().await {
                match event {
                    StreamEvent::Token { content } => {
                        fragments.push_str(&content);
                        yield json!({ "type": "token", "content": content });
                    }
                    StreamEvent::Done { summary } => {
                        let completion_tokens = summary
                            .completion_tokens
                            .unwrap_or_else(|| estimator.estimate_text(&summary.text));
                        let assistant_message =
                            Message::assistant(&summary.text).with_tokens(completion_tokens);
                        record.messages.push(assistant_message.clone());
                        record.conversation.record_usage(completion_tokens);

                        if record.messages.len() <= 2 && record.conversation.has_default_title() {
                            record.conversation.title = titles.generate(&first_user_text).await;
                        }
                        if let Err(err) = store.save(&record).await {
                            error!("failed to persist streamed response: {err}");
                            yield json!({ "type": "error", "message": "Failed to save response" });
                            return;
                        }

                        let usage = record.conversation.usage();
                        yield json!({
                            "type": "done",
                            "user_message": user_message,
                            "assistant_message": assistant_message,
                            "conversation": record.conversation,
                            "token_usage": usage,
                        });
                        return;
                    }
                    StreamEvent::Error { message } => {
                        // Delivered text stays valid even when the stream
                        // dies; persist what arrived so the transcript and
                        // the ledger agree with what the client saw.
                        if !fragments.is_empty() {
                            let tokens = estimator.estimate_text(&fragments);
                            record
                                .messages
                                .push(Message::assistant(&fragments).with_tokens(tokens));
                            record.conversation.record_usage(tokens);
                            if let Err(err) = store.save(&record).await {
                                error!("failed to persist partial response: {err}");
                            }
                        }
                        yield json!({ "type": "error", "message": message });
                        return;
                    }
                }
            }

            warn!("completion stream ended without a terminal event");
            yield json!({ "type": "error", "message": "Stream ended unexpectedly" });
        };

        Ok(Box::pin(events))
    }

    /// Shared front half of both send paths: load or create the
    /// conversation, admit the request against the budget, persist the user
    /// message, and assemble the trimmed context.
    async fn prepare(&self, request: &SendMessageRequest) -> Result<PreparedSend> {
        let text = request.message.trim();
        if text.is_empty() {
            return Err(AppError::EmptyMessage);
        }

        let mut record = match request.conversation_id {
            Some(id) => self.store.load(id).await?,
            None => {
                let record = ConversationRecord::new(Conversation::new(self.default_token_limit));
                self.store.save(&record).await?;
                record
            }
        };

        let guard = self
            .ledger
            .lock_for(record.conversation.id)
            .lock_owned()
            .await;
        // Another request may have finished while we waited for the lock.
        record = self.store.load(record.conversation.id).await?;

        let message_tokens = self.estimator.estimate_text(text);
        if !BudgetGate::admit(&record.conversation, message_tokens + ADMISSION_RESERVE) {
            return Err(AppError::BudgetExceeded {
                usage: record.conversation.usage(),
            });
        }

        let user_message = Message::user(text).with_tokens(message_tokens);
        let history = record.messages.clone();
        record.messages.push(user_message.clone());
        record.conversation.record_usage(message_tokens);
        self.store.save(&record).await?;

        let persona = Persona::from_key(request.persona.as_deref());
        let chunks = self.knowledge.retrieve(text).await;
        let system = Message::system(compose_system_prompt(persona.system_prompt(), &chunks));

        let mut stack = Vec::with_capacity(history.len() + 2);
        stack.push(system);
        stack.extend(history);
        stack.push(user_message.clone());

        let context = ContextBuilder::new(self.estimator.as_ref()).build(
            &stack,
            record.conversation.remaining_tokens(),
            RESPONSE_RESERVE,
        );

        Ok(PreparedSend {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            guard,
            record,
            user_message,
            context,
        })
    }

    async fn maybe_title(&self, record: &mut ConversationRecord, first_user_text: &str) {
        if record.messages.len() <= 2 && record.conversation.has_default_title() {
            record.conversation.title = self.titles.generate(first_user_text).await;
        }
    }

    // --- conversation management ---

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.store.list().await?)
    }

    pub async fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        Ok(self.store.load(id).await?.conversation)
    }

    pub async fn create_conversation(&self, token_limit: Option<u32>) -> Result<Conversation> {
        let record = ConversationRecord::new(Conversation::new(
            token_limit.unwrap_or(self.default_token_limit),
        ));
        self.store.save(&record).await?;
        Ok(record.conversation)
    }

    pub async fn delete_conversation(&self, id: Uuid) -> Result<()> {
        self.store.delete(id).await?;
        self.ledger.forget(id);
        Ok(())
    }

    pub async fn messages(&self, id: Uuid) -> Result<Vec<Message>> {
        Ok(self.store.messages(id).await?)
    }

    /// Drop the transcript and reset the usage counter; the ceiling stays.
    pub async fn clear_conversation(&self, id: Uuid) -> Result<Conversation> {
        let lock = self.ledger.lock_for(id);
        let _guard = lock.lock().await;
        let mut record = self.store.load(id).await?;
        record.messages.clear();
        record.conversation.reset_usage();
        self.store.save(&record).await?;
        Ok(record.conversation)
    }

    /// Raise the conversation ceiling, e.g. after a payment.
    pub async fn top_up(&self, id: Uuid, amount: u32) -> Result<Conversation> {
        let lock = self.ledger.lock_for(id);
        let _guard = lock.lock().await;
        let mut record = self.store.load(id).await?;
        record.conversation.add_tokens(amount);
        self.store.save(&record).await?;
        Ok(record.conversation)
    }

}

struct PreparedSend {
    model: String,
    guard: tokio::sync::OwnedMutexGuard<()>,
    record: ConversationRecord,
    user_message: Message,
    context: Vec<Message>,
}
