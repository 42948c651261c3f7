use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::conversation::conversation_id;
use crate::models::message::Message;
use crate::pagination::{Page, PageParams};
use crate::services::delivery::DeliveryService;
use crate::services::message_store::MessageStore;
use crate::state::AppState;

/// GET /api/v1/conversations/{peer_id}/messages
/// Message history between the caller and the peer, ascending send order.
pub async fn get_message_history(
    State(state): State<AppState>,
    user: User,
    Path(peer_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Message>>, AppError> {
    let cursor = params.cursor()?;
    let limit = params.limit(50, state.config.history_page_limit);
    let page = MessageStore::get_messages_by_conversation(
        &state.db,
        conversation_id(user.id, peer_id),
        user.id,
        cursor,
        limit,
    )
    .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub message_id: Uuid,
}

/// POST /api/v1/messages/recall
pub async fn recall_message(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<RecallRequest>,
) -> Result<Json<Message>, AppError> {
    let message = DeliveryService::recall(&state, user.id, body.message_id).await?;
    Ok(Json(message))
}

/// DELETE /api/v1/messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    user: User,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    DeliveryService::delete(&state, user.id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub message_id: Uuid,
    pub receiver_id: Uuid,
    pub content: Option<String>,
}

/// POST /api/v1/messages/forward
pub async fn forward_message(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<ForwardRequest>,
) -> Result<Json<Message>, AppError> {
    let message = DeliveryService::forward(
        &state,
        user.id,
        body.message_id,
        body.receiver_id,
        body.content,
    )
    .await?;
    Ok(Json(message))
}
