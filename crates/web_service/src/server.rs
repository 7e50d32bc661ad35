use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use chat_core::Config;
use conversation_store::{ConversationLedger, FileConversationStore};
use llm_gateway::{
    CompletionOrchestrator, HeuristicEstimator, ModelCache, ModelCatalog, OpenRouterTransport,
    SharedEstimator, TitleGenerator, FALLBACK_MODELS,
};
use log::info;
use tokio::sync::RwLock;

use crate::controllers::{chat_controller, conversation_controller, model_controller};
use crate::services::chat_service::ChatService;
use crate::services::knowledge::NoKnowledge;

pub struct AppState {
    pub chat: Arc<ChatService>,
    pub catalog: ModelCatalog,
    pub model_cache: RwLock<Option<ModelCache>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let transport = Arc::new(
            OpenRouterTransport::new(config.api_key.clone())
                .with_base_url(config.api_base.clone())
                .with_referer(config.frontend_url.clone()),
        );

        let backups = FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
        let orchestrator = Arc::new(CompletionOrchestrator::new(transport.clone(), backups));
        let titles = Arc::new(TitleGenerator::new(
            transport,
            config.default_model.clone(),
        ));
        let estimator: SharedEstimator = Arc::new(HeuristicEstimator::new());

        let chat = Arc::new(ChatService::new(
            Arc::new(FileConversationStore::new(&config.data_dir)),
            Arc::new(ConversationLedger::new()),
            orchestrator,
            titles,
            Arc::new(NoKnowledge),
            estimator,
            config.default_model.clone(),
            config.default_token_limit,
        ));

        Self {
            chat,
            catalog: ModelCatalog::new(config.api_base.clone()),
            model_cache: RwLock::new(None),
        }
    }
}

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(chat_controller::config)
            .configure(conversation_controller::config)
            .configure(model_controller::config),
    );
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let frontend_url = config.frontend_url.clone();
    let port = config.port;
    let app_state = web::Data::new(AppState::from_config(&config));

    info!("starting chat service on http://127.0.0.1:{port}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .configure(app_config)
    })
    .bind(("127.0.0.1", port))
    .with_context(|| format!("failed to bind port {port}"))?
    .run()
    .await
    .context("server error")
}
