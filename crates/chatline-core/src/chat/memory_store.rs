//! In-memory conversation store backed by `DashMap`.
//!
//! Each conversation and its messages live in one map entry, so appends to a
//! conversation are serialized by that entry's lock while appends to other
//! conversations proceed independently. Ids come from atomic counters.
//! Nothing is held across an `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use chatline_types::chat::{
    Conversation, ConversationId, Exchange, ExchangeTarget, Message, MessageId, Sender, UserId,
};
use chatline_types::error::RepositoryError;

use super::repository::{ConversationRepository, next_message_timestamp};

struct ConversationEntry {
    conversation: Conversation,
    messages: Vec<Message>,
}

impl ConversationEntry {
    fn push(&mut self, id: MessageId, sender: Sender, content: &str) -> Message {
        let timestamp = next_message_timestamp(self.messages.last().map(|m| m.timestamp));
        let message = Message {
            id,
            conversation_id: self.conversation.id,
            sender,
            content: content.to_string(),
            timestamp,
        };
        self.messages.push(message.clone());
        message
    }
}

/// Non-durable implementation of `ConversationRepository`.
///
/// Cloning produces a shared view of the same underlying data.
#[derive(Clone)]
pub struct InMemoryConversationRepository {
    conversations: Arc<DashMap<ConversationId, ConversationEntry>>,
    next_conversation_id: Arc<AtomicI64>,
    next_message_id: Arc<AtomicI64>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(DashMap::new()),
            next_conversation_id: Arc::new(AtomicI64::new(1)),
            next_message_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn allocate_conversation(&self, user_id: UserId) -> Conversation {
        Conversation {
            id: ConversationId(self.next_conversation_id.fetch_add(1, Ordering::SeqCst)),
            user_id,
            created_at: Utc::now(),
        }
    }

    fn allocate_message_id(&self) -> MessageId {
        MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for InMemoryConversationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationRepository for InMemoryConversationRepository {
    async fn create_conversation(&self, user_id: UserId) -> Result<Conversation, RepositoryError> {
        let conversation = self.allocate_conversation(user_id);
        self.conversations.insert(
            conversation.id,
            ConversationEntry {
                conversation: conversation.clone(),
                messages: Vec::new(),
            },
        );
        Ok(conversation)
    }

    async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|entry| entry.conversation.clone()))
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let mut entry = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(RepositoryError::NotFound)?;
        // Allocated under the entry lock so ids follow insertion order.
        let id = self.allocate_message_id();
        Ok(entry.push(id, sender, content))
    }

    async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, RepositoryError> {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|entry| entry.conversation.user_id == user_id)
            .map(|entry| entry.conversation.clone())
            .collect();
        conversations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        debug!(user_id = %user_id, count = conversations.len(), "Listed conversations");
        Ok(conversations)
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.conversations
            .get(&conversation_id)
            .map(|entry| entry.messages.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn record_exchange(
        &self,
        target: ExchangeTarget,
        user_content: &str,
        bot_content: &str,
    ) -> Result<Exchange, RepositoryError> {
        match target {
            ExchangeTarget::Existing(conversation_id) => {
                let mut entry = self
                    .conversations
                    .get_mut(&conversation_id)
                    .ok_or(RepositoryError::NotFound)?;
                let user_message = entry.push(self.allocate_message_id(), Sender::User, user_content);
                let bot_message = entry.push(self.allocate_message_id(), Sender::Bot, bot_content);
                Ok(Exchange {
                    conversation: entry.conversation.clone(),
                    user_message,
                    bot_message,
                })
            }
            ExchangeTarget::New(user_id) => {
                let conversation = self.allocate_conversation(user_id);
                let mut entry = ConversationEntry {
                    conversation: conversation.clone(),
                    messages: Vec::with_capacity(2),
                };
                let user_message = entry.push(self.allocate_message_id(), Sender::User, user_content);
                let bot_message = entry.push(self.allocate_message_id(), Sender::Bot, bot_content);
                self.conversations.insert(conversation.id, entry);
                Ok(Exchange {
                    conversation,
                    user_message,
                    bot_message,
                })
            }
        }
    }
}
