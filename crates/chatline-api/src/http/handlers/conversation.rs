//! Conversation HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/conversations?user_id={id} - List a user's conversations
//! - POST /api/conversations              - Create an empty conversation

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use chatline_types::chat::{Conversation, UserId};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConversationListQuery {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub user_id: UserId,
}

/// GET /api/conversations?user_id={id} - Most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
    query: Result<Query<ConversationListQuery>, QueryRejection>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let Query(query) = query?;
    let conversations = state.chat_service.list_conversations(query.user_id).await?;
    Ok(Json(conversations))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let Json(request) = payload?;
    let conversation = state.chat_service.create_conversation(request.user_id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}
