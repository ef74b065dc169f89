//! ConversationRepository trait definition.
//!
//! The Conversation Store: sole owner of conversation and message records.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use chatline_types::chat::{
    Conversation, ConversationId, Exchange, ExchangeTarget, Message, Sender, UserId,
};
use chatline_types::error::RepositoryError;

/// Repository trait for conversation and message persistence.
///
/// Implementations: `InMemoryConversationRepository` (this crate) and
/// `SqliteConversationRepository` (chatline-infra).
pub trait ConversationRepository: Send + Sync {
    /// Allocate a new conversation owned by `user_id`.
    fn create_conversation(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Get a conversation by ID.
    fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Append a message with a store-assigned id and timestamp.
    ///
    /// Returns `RepositoryError::NotFound` if the conversation does not exist.
    fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// List a user's conversations, most recent first.
    fn list_conversations(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// List a conversation's messages in insertion order.
    ///
    /// Returns `RepositoryError::NotFound` if the conversation does not exist.
    fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Record a user message and its bot reply as one unit.
    ///
    /// Creates the conversation first for `ExchangeTarget::New`. Either every
    /// record is written or none is.
    fn record_exchange(
        &self,
        target: ExchangeTarget,
        user_content: &str,
        bot_content: &str,
    ) -> impl std::future::Future<Output = Result<Exchange, RepositoryError>> + Send;
}

/// Timestamp for a message appended after `latest` in the same conversation.
///
/// Clamped so timestamps never go backwards within a conversation, even if
/// the wall clock does.
pub fn next_message_timestamp(
    latest: Option<chrono::DateTime<chrono::Utc>>,
) -> chrono::DateTime<chrono::Utc> {
    let now = chrono::Utc::now();
    match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    }
}
