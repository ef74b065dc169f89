//! Message HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/messages?conversation_id={id}  - Display view of a conversation
//! - GET  /api/conversations/{id}/messages    - Full message records
//! - POST /api/conversations/{id}/messages    - Append a single message

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use chatline_types::chat::{ConversationId, Message, MessageView, Sender};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender: Sender,
    pub content: String,
}

/// GET /api/messages?conversation_id={id} - `{sender, content, timestamp}` in order.
pub async fn list_message_views(
    State(state): State<AppState>,
    query: Result<Query<MessageListQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let Query(query) = query?;
    let messages = state.chat_service.list_messages(query.conversation_id).await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<Vec<Message>>, AppError> {
    let Path(conversation_id) = id?;
    let messages = state.chat_service.list_messages(conversation_id).await?;
    Ok(Json(messages))
}

/// POST /api/conversations/{id}/messages - Stored as-is, no reply is generated.
pub async fn post_message(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let Path(conversation_id) = id?;
    let Json(request) = payload?;
    let message = state
        .chat_service
        .post_message(conversation_id, request.sender, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
