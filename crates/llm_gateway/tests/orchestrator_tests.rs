//! Fallback chain and retry behavior, driven by a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_core::Message;
use futures_util::StreamExt;
use llm_gateway::{
    Completion, CompletionOrchestrator, CompletionRequest, CompletionTransport,
    OrchestratorError, ProviderError, StreamEvent, TokenStream,
};

/// One scripted outcome for a transport call, in call order.
#[derive(Debug, Clone)]
enum Step {
    /// Blocking call succeeds with this text.
    Succeed(&'static str),
    /// Streaming call opens and yields these items.
    OpenStream(Vec<StreamItem>),
    Auth,
    Capacity,
    Request,
}

#[derive(Debug, Clone)]
enum StreamItem {
    Fragment(&'static str),
    Break,
}

struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self, model: &str) -> Step {
        self.calls.lock().unwrap().push(model.to_string());
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more times than scripted")
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        match self.next_step(&request.model) {
            Step::Succeed(text) => Ok(Completion {
                text: text.to_string(),
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
            }),
            Step::Auth => Err(ProviderError::Auth("invalid key".into())),
            Step::Capacity => Err(ProviderError::Capacity("429".into())),
            Step::Request => Err(ProviderError::Request("model unavailable".into())),
            Step::OpenStream(_) => panic!("blocking call hit a stream step"),
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<TokenStream, ProviderError> {
        match self.next_step(&request.model) {
            Step::OpenStream(items) => {
                let items: Vec<Result<String, ProviderError>> = items
                    .into_iter()
                    .map(|item| match item {
                        StreamItem::Fragment(text) => Ok(text.to_string()),
                        StreamItem::Break => {
                            Err(ProviderError::Stream("connection reset".into()))
                        }
                    })
                    .collect();
                Ok(Box::pin(futures_util::stream::iter(items)))
            }
            Step::Auth => Err(ProviderError::Auth("invalid key".into())),
            Step::Capacity => Err(ProviderError::Capacity("429".into())),
            Step::Request => Err(ProviderError::Request("model unavailable".into())),
            Step::Succeed(_) => panic!("stream call hit a blocking step"),
        }
    }
}

fn orchestrator(
    transport: &Arc<ScriptedTransport>,
    backups: &[&str],
) -> CompletionOrchestrator {
    CompletionOrchestrator::new(
        Arc::clone(transport) as Arc<dyn CompletionTransport>,
        backups.iter().map(|s| s.to_string()).collect(),
    )
}

fn request(model: &str) -> CompletionRequest {
    CompletionRequest::new(model, vec![Message::user("hello")], 4000)
}

#[tokio::test(start_paused = true)]
async fn capacity_failures_retry_then_fall_back() {
    let transport = ScriptedTransport::new(vec![
        Step::Capacity,
        Step::Capacity,
        Step::Capacity,
        Step::Succeed("from backup"),
    ]);
    let orch = orchestrator(&transport, &["backup-model"]);

    let completion = orch.complete(&request("preferred")).await.unwrap();
    assert_eq!(completion.text, "from backup");
    assert_eq!(
        transport.calls(),
        vec!["preferred", "preferred", "preferred", "backup-model"]
    );
}

#[tokio::test(start_paused = true)]
async fn abandoned_model_leaves_no_residual_state() {
    // Success on B after A's failures must equal success on B alone.
    let failing = ScriptedTransport::new(vec![
        Step::Capacity,
        Step::Capacity,
        Step::Capacity,
        Step::Succeed("answer"),
    ]);
    let clean = ScriptedTransport::new(vec![Step::Succeed("answer")]);

    let with_failures = orchestrator(&failing, &["model-b"])
        .complete(&request("model-a"))
        .await
        .unwrap();
    let direct = orchestrator(&clean, &[])
        .complete(&request("model-b"))
        .await
        .unwrap();

    assert_eq!(with_failures.text, direct.text);
    assert_eq!(with_failures.prompt_tokens, direct.prompt_tokens);
    assert_eq!(with_failures.completion_tokens, direct.completion_tokens);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_short_circuits_the_chain() {
    let transport = ScriptedTransport::new(vec![Step::Auth]);
    let orch = orchestrator(&transport, &["b", "c", "d"]);

    let err = orch.complete(&request("a")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Auth(_)));
    // No other model was ever contacted.
    assert_eq!(transport.calls(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn request_error_advances_without_retry() {
    let transport = ScriptedTransport::new(vec![Step::Request, Step::Succeed("ok")]);
    let orch = orchestrator(&transport, &["b"]);

    let completion = orch.complete(&request("a")).await.unwrap();
    assert_eq!(completion.text, "ok");
    assert_eq!(transport.calls(), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn preferred_model_is_not_tried_twice_when_listed_as_backup() {
    let transport = ScriptedTransport::new(vec![Step::Request, Step::Succeed("ok")]);
    let orch = orchestrator(&transport, &["a", "b"]);

    orch.complete(&request("a")).await.unwrap();
    assert_eq!(transport.calls(), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_chain_reports_all_providers_exhausted() {
    let transport = ScriptedTransport::new(vec![Step::Request, Step::Request, Step::Request]);
    let orch = orchestrator(&transport, &["b", "c"]);

    let err = orch.complete(&request("a")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::AllProvidersExhausted { .. }));
    assert_eq!(transport.calls(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn deep_fallback_reaches_later_models() {
    // Preferred rate-limited through its retry budget, then three backups;
    // the last one answers.
    let transport = ScriptedTransport::new(vec![
        Step::Capacity,
        Step::Capacity,
        Step::Capacity,
        Step::Request,
        Step::Request,
        Step::Succeed("deep answer"),
    ]);
    let orch = orchestrator(&transport, &["b", "c", "d"]);

    let completion = orch.complete(&request("a")).await.unwrap();
    assert_eq!(completion.text, "deep answer");
    assert_eq!(transport.calls(), vec!["a", "a", "a", "b", "c", "d"]);
}

// --- Streaming ---

async fn collect(mut stream: llm_gateway::orchestrator::EventStream) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn stream_delivers_fragments_then_done_summary() {
    let transport = ScriptedTransport::new(vec![Step::OpenStream(vec![
        StreamItem::Fragment("Hel"),
        StreamItem::Fragment("lo"),
    ])]);
    let orch = orchestrator(&transport, &[]);

    let events = collect(orch.stream(request("a"))).await;
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], StreamEvent::Token { content } if content == "Hel"));
    assert!(matches!(&events[1], StreamEvent::Token { content } if content == "lo"));
    match &events[2] {
        StreamEvent::Done { summary } => assert_eq!(summary.text, "Hello"),
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn stream_error_after_fragments_is_terminal_not_fallback() {
    // Provider disconnects after 5 fragments: exactly those 5 token events,
    // then one error event, and the backup model is never contacted.
    let transport = ScriptedTransport::new(vec![Step::OpenStream(vec![
        StreamItem::Fragment("a"),
        StreamItem::Fragment("b"),
        StreamItem::Fragment("c"),
        StreamItem::Fragment("d"),
        StreamItem::Fragment("e"),
        StreamItem::Break,
    ])]);
    let orch = orchestrator(&transport, &["backup"]);

    let events = collect(orch.stream(request("a"))).await;
    assert_eq!(events.len(), 6);
    for event in &events[..5] {
        assert!(matches!(event, StreamEvent::Token { .. }));
    }
    assert!(matches!(&events[5], StreamEvent::Error { .. }));
    assert_eq!(transport.calls(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn stream_falls_back_when_no_fragment_was_delivered() {
    let transport = ScriptedTransport::new(vec![
        Step::Capacity,
        Step::Capacity,
        Step::Capacity,
        Step::OpenStream(vec![StreamItem::Fragment("backup answer")]),
    ]);
    let orch = orchestrator(&transport, &["backup"]);

    let events = collect(orch.stream(request("preferred"))).await;
    assert!(matches!(&events[0], StreamEvent::Token { content } if content == "backup answer"));
    assert!(matches!(&events[1], StreamEvent::Done { .. }));
    assert_eq!(
        transport.calls(),
        vec!["preferred", "preferred", "preferred", "backup"]
    );
}

#[tokio::test(start_paused = true)]
async fn stream_that_yields_nothing_advances_the_chain() {
    let transport = ScriptedTransport::new(vec![
        Step::OpenStream(vec![]),
        Step::OpenStream(vec![StreamItem::Fragment("real")]),
    ]);
    let orch = orchestrator(&transport, &["b"]);

    let events = collect(orch.stream(request("a"))).await;
    assert!(matches!(&events[0], StreamEvent::Token { content } if content == "real"));
    assert_eq!(transport.calls(), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn stream_auth_failure_is_immediately_terminal() {
    let transport = ScriptedTransport::new(vec![Step::Auth]);
    let orch = orchestrator(&transport, &["b", "c"]);

    let events = collect(orch.stream(request("a"))).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { .. }));
    assert_eq!(transport.calls(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn stream_exhaustion_ends_with_a_single_error_event() {
    let transport = ScriptedTransport::new(vec![Step::Request, Step::Request]);
    let orch = orchestrator(&transport, &["b"]);

    let events = collect(orch.stream(request("a"))).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error { message } => {
            assert!(message.contains("unavailable") || message.contains("wait"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}
