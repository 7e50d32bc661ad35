use actix_web::{delete, get, post, web, HttpResponse};
use uuid::Uuid;

use crate::dto::{
    ConversationListResponse, ConversationResponse, CreateConversationRequest, MessagesResponse,
    TopUpRequest,
};
use crate::error::AppError;
use crate::server::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_conversations)
        .service(create_conversation)
        .service(get_conversation)
        .service(delete_conversation)
        .service(get_messages)
        .service(clear_conversation)
        .service(get_usage)
        .service(top_up);
}

/// GET /conversations - most recently updated first
#[get("/conversations")]
pub async fn list_conversations(
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let conversations = app_state.chat.list_conversations().await?;
    Ok(HttpResponse::Ok().json(ConversationListResponse { conversations }))
}

/// POST /conversations - create an empty conversation
#[post("/conversations")]
pub async fn create_conversation(
    app_state: web::Data<AppState>,
    body: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation = app_state
        .chat
        .create_conversation(body.token_limit)
        .await?;
    Ok(HttpResponse::Created().json(ConversationResponse {
        token_usage: conversation.usage(),
        conversation,
    }))
}

/// GET /conversations/{id}
#[get("/conversations/{id}")]
pub async fn get_conversation(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation = app_state.chat.get_conversation(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ConversationResponse {
        token_usage: conversation.usage(),
        conversation,
    }))
}

/// DELETE /conversations/{id}
#[delete("/conversations/{id}")]
pub async fn delete_conversation(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    app_state.chat.delete_conversation(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /conversations/{id}/messages - chronological transcript
#[get("/conversations/{id}/messages")]
pub async fn get_messages(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let messages = app_state.chat.messages(id).await?;
    Ok(HttpResponse::Ok().json(MessagesResponse {
        conversation_id: id,
        messages,
    }))
}

/// POST /conversations/{id}/clear - drop messages and reset usage
#[post("/conversations/{id}/clear")]
pub async fn clear_conversation(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation = app_state.chat.clear_conversation(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ConversationResponse {
        token_usage: conversation.usage(),
        conversation,
    }))
}

/// GET /conversations/{id}/usage
#[get("/conversations/{id}/usage")]
pub async fn get_usage(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation = app_state.chat.get_conversation(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(conversation.usage()))
}

/// POST /conversations/{id}/top-up - raise the token ceiling
#[post("/conversations/{id}/top-up")]
pub async fn top_up(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TopUpRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation = app_state
        .chat
        .top_up(path.into_inner(), body.amount)
        .await?;
    Ok(HttpResponse::Ok().json(ConversationResponse {
        token_usage: conversation.usage(),
        conversation,
    }))
}
