use actix_web::{post, web, HttpResponse};
use log::info;

use crate::dto::SendMessageRequest;
use crate::error::AppError;
use crate::server::AppState;
use crate::services::sse;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(send_message).service(stream_message);
}

/// POST /chat/send - blocking completion
#[post("/chat/send")]
pub async fn send_message(
    app_state: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    info!(
        "chat send (conversation: {:?}, model: {:?})",
        request.conversation_id, request.model
    );

    let response = app_state.chat.send(request).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /chat/stream - completion streamed over SSE
///
/// Budget denial and unknown conversations fail before the stream opens and
/// return plain JSON errors; later failures arrive as `error` events.
#[post("/chat/stream")]
pub async fn stream_message(
    app_state: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> Result<sse::SseResponder, AppError> {
    let request = body.into_inner();
    info!(
        "chat stream (conversation: {:?}, model: {:?})",
        request.conversation_id, request.model
    );

    let events = app_state.chat.send_streaming(request).await?;
    Ok(sse::respond(events))
}
