//! Chat exchange HTTP handler.
//!
//! Endpoint:
//! - POST /api/chat - Send a user message and receive the bot's reply

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use chatline_types::chat::{ChatReply, ChatRequest};

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/chat
///
/// A null or absent `conversation_id` starts a new conversation; the reply
/// carries the id to use for follow-up messages.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(request) = payload?;
    let reply = state.chat_service.send_message(request).await?;
    Ok(Json(reply))
}
