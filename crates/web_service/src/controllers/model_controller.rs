use actix_web::{get, web, HttpResponse};
use llm_gateway::catalog::{ModelCache, ModelInfo, ModelPricing, FEATURED_MODELS};
use log::warn;

use crate::dto::ModelsResponse;
use crate::error::AppError;
use crate::server::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_models);
}

/// GET /models - the curated model listing, cached with a TTL
#[get("/models")]
pub async fn list_models(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    {
        let cache = app_state.model_cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(ok_response(cached.value.clone(), app_state.chat.default_model()));
            }
        }
    }

    let models = match app_state.catalog.fetch().await {
        Ok(models) => {
            let mut cache = app_state.model_cache.write().await;
            *cache = Some(ModelCache::new(models.clone(), ModelCache::DEFAULT_TTL));
            models
        }
        Err(err) => {
            warn!("model listing fetch failed: {err}");
            // A stale cache beats the static fallback; the static fallback
            // beats an error page.
            let cache = app_state.model_cache.read().await;
            match cache.as_ref() {
                Some(stale) => stale.value.clone(),
                None => featured_fallback(),
            }
        }
    };

    Ok(ok_response(models, app_state.chat.default_model()))
}

fn ok_response(models: Vec<ModelInfo>, default_model: &str) -> HttpResponse {
    HttpResponse::Ok().json(ModelsResponse {
        models,
        default_model: default_model.to_string(),
    })
}

fn featured_fallback() -> Vec<ModelInfo> {
    FEATURED_MODELS
        .iter()
        .map(|(id, name)| ModelInfo {
            id: (*id).to_string(),
            name: (*name).to_string(),
            provider: id.split('/').next().unwrap_or("other").to_string(),
            context_length: 0,
            is_free: false,
            featured: true,
            pricing: ModelPricing {
                prompt: "N/A".to_string(),
                completion: "N/A".to_string(),
            },
        })
        .collect()
}
