//! Chat service orchestrating conversation lifecycle and reply generation.
//!
//! ChatService coordinates the ConversationRepository and the reply generator
//! for a single chat exchange: resolve or create the conversation, build the
//! history, generate the reply under a timeout, and persist both turns
//! according to the configured [`FailurePolicy`].

use std::time::Duration;

use tracing::{debug, info, warn};

use chatline_types::chat::{
    ChatReply, ChatRequest, Conversation, ConversationId, ExchangeTarget, Message, Sender, UserId,
};
use chatline_types::config::{ChatConfig, FailurePolicy, GeneratorConfig};
use chatline_types::error::ChatError;
use chatline_types::generation::{GenerationError, HistoryTurn};

use crate::chat::repository::ConversationRepository;
use crate::generation::box_generator::BoxReplyGenerator;

/// Tunables for [`ChatService`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub failure_policy: FailurePolicy,
    pub max_message_chars: usize,
    pub generation_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(chat: &ChatConfig, generator: &GeneratorConfig) -> Self {
        Self {
            failure_policy: chat.failure_policy,
            max_message_chars: chat.max_message_chars,
            generation_timeout: Duration::from_secs(generator.timeout_secs),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default(), &GeneratorConfig::default())
    }
}

/// Orchestrates chat exchanges and read queries over a conversation store.
///
/// Generic over `ConversationRepository` so chatline-core never depends on
/// chatline-infra.
pub struct ChatService<R: ConversationRepository> {
    repo: R,
    generator: BoxReplyGenerator,
    settings: ChatSettings,
}

impl<R: ConversationRepository> ChatService<R> {
    pub fn new(repo: R, generator: BoxReplyGenerator, settings: ChatSettings) -> Self {
        Self {
            repo,
            generator,
            settings,
        }
    }

    /// Access the conversation repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    // --- Chat exchange ---

    /// Handle one user message and return the assistant's reply.
    ///
    /// A missing `conversation_id` starts a new conversation for the user.
    /// A `conversation_id` that is unknown or owned by another user is
    /// `NotFound`.
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        validate_user(request.user_id)?;
        self.validate_content(&request.message)?;

        let existing = match request.conversation_id {
            Some(id) => Some(self.owned_conversation(request.user_id, id).await?),
            None => None,
        };

        let (conversation_id, reply) = match self.settings.failure_policy {
            FailurePolicy::Atomic => {
                self.exchange_atomic(request.user_id, existing, &request.message)
                    .await?
            }
            FailurePolicy::KeepUserMessage => {
                self.exchange_keep_user_message(request.user_id, existing, &request.message)
                    .await?
            }
        };

        Ok(ChatReply {
            conversation_id,
            user_message: request.message,
            ai_response: reply,
        })
    }

    /// Generate first, then commit conversation and both turns in one write.
    async fn exchange_atomic(
        &self,
        user_id: UserId,
        existing: Option<Conversation>,
        message: &str,
    ) -> Result<(ConversationId, String), ChatError> {
        let mut history = match &existing {
            Some(conversation) => self.history(conversation.id).await?,
            None => Vec::new(),
        };
        history.push(HistoryTurn::user(message));

        let reply = self.generate(&history).await?;

        let target = match existing {
            Some(conversation) => ExchangeTarget::Existing(conversation.id),
            None => ExchangeTarget::New(user_id),
        };
        let exchange = self.repo.record_exchange(target, message, &reply).await?;

        if matches!(target, ExchangeTarget::New(_)) {
            info!(
                conversation_id = %exchange.conversation.id,
                user_id = %user_id,
                "Conversation created"
            );
        }
        info!(
            conversation_id = %exchange.conversation.id,
            user_message_id = %exchange.user_message.id,
            bot_message_id = %exchange.bot_message.id,
            "Exchange recorded"
        );

        Ok((exchange.conversation.id, exchange.bot_message.content))
    }

    /// Persist the user turn before generating; a failed generation leaves it.
    async fn exchange_keep_user_message(
        &self,
        user_id: UserId,
        existing: Option<Conversation>,
        message: &str,
    ) -> Result<(ConversationId, String), ChatError> {
        let conversation = match existing {
            Some(conversation) => conversation,
            None => self.create_conversation(user_id).await?,
        };

        self.repo
            .append_message(conversation.id, Sender::User, message)
            .await?;

        let history = self.history(conversation.id).await?;
        let reply = match self.generate(&history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    conversation_id = %conversation.id,
                    "User message kept without a bot reply"
                );
                return Err(e);
            }
        };

        let bot_message = self
            .repo
            .append_message(conversation.id, Sender::Bot, &reply)
            .await?;
        info!(
            conversation_id = %conversation.id,
            bot_message_id = %bot_message.id,
            "Exchange recorded"
        );

        Ok((conversation.id, bot_message.content))
    }

    async fn history(&self, conversation_id: ConversationId) -> Result<Vec<HistoryTurn>, ChatError> {
        let messages = self.repo.list_messages(conversation_id).await?;
        Ok(messages.iter().map(HistoryTurn::from).collect())
    }

    /// Call the generator, bounded by the configured timeout.
    async fn generate(&self, history: &[HistoryTurn]) -> Result<String, ChatError> {
        let timeout = self.settings.generation_timeout;
        let result = match tokio::time::timeout(timeout, self.generator.generate(history)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(timeout.as_secs())),
        };

        match result {
            Ok(reply) if reply.trim().is_empty() => {
                warn!(generator = self.generator.name(), "Generator returned an empty reply");
                Err(GenerationError::EmptyReply.into())
            }
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "Reply generation failed");
                Err(e.into())
            }
        }
    }

    // --- Conversations ---

    /// Explicitly create an empty conversation for a user.
    pub async fn create_conversation(&self, user_id: UserId) -> Result<Conversation, ChatError> {
        validate_user(user_id)?;
        let conversation = self.repo.create_conversation(user_id).await?;
        info!(conversation_id = %conversation.id, user_id = %user_id, "Conversation created");
        Ok(conversation)
    }

    /// List a user's conversations, most recent first.
    pub async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, ChatError> {
        validate_user(user_id)?;
        Ok(self.repo.list_conversations(user_id).await?)
    }

    /// Get a conversation, `NotFound` when absent.
    pub async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Conversation, ChatError> {
        self.repo
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatError::NotFound)
    }

    // --- Messages ---

    /// List a conversation's messages in display order.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ChatError> {
        let messages = self.repo.list_messages(conversation_id).await?;
        debug!(conversation_id = %conversation_id, count = messages.len(), "Listed messages");
        Ok(messages)
    }

    /// Append a single message without generating a reply.
    pub async fn post_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, ChatError> {
        self.validate_content(content)?;
        Ok(self
            .repo
            .append_message(conversation_id, sender, content)
            .await?)
    }

    async fn owned_conversation(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Conversation, ChatError> {
        let conversation = self.get_conversation(conversation_id).await?;
        if conversation.user_id != user_id {
            warn!(
                conversation_id = %conversation_id,
                user_id = %user_id,
                "Conversation belongs to a different user"
            );
            return Err(ChatError::NotFound);
        }
        Ok(conversation)
    }

    fn validate_content(&self, content: &str) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }
        let chars = content.chars().count();
        if chars > self.settings.max_message_chars {
            return Err(ChatError::Validation(format!(
                "message is {chars} characters, limit is {}",
                self.settings.max_message_chars
            )));
        }
        Ok(())
    }
}

fn validate_user(user_id: UserId) -> Result<(), ChatError> {
    if user_id.0 <= 0 {
        return Err(ChatError::Validation(format!("invalid user_id: {user_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use crate::chat::memory_store::InMemoryConversationRepository;
    use crate::generation::echo::EchoGenerator;
    use crate::generation::generator::ReplyGenerator;

    struct FailingGenerator;

    impl ReplyGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _history: &[HistoryTurn]) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("connection refused".to_string()))
        }
    }

    struct SlowGenerator(Duration);

    impl ReplyGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _history: &[HistoryTurn]) -> Result<String, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok("too late".to_string())
        }
    }

    struct BlankGenerator;

    impl ReplyGenerator for BlankGenerator {
        fn name(&self) -> &str {
            "blank"
        }

        async fn generate(&self, _history: &[HistoryTurn]) -> Result<String, GenerationError> {
            Ok("   ".to_string())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingGenerator {
        seen: Arc<Mutex<Vec<Vec<HistoryTurn>>>>,
    }

    impl ReplyGenerator for RecordingGenerator {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, history: &[HistoryTurn]) -> Result<String, GenerationError> {
            self.seen.lock().unwrap().push(history.to_vec());
            Ok(format!("reply #{}", history.len()))
        }
    }

    fn service_with<G: ReplyGenerator + 'static>(
        generator: G,
        policy: FailurePolicy,
    ) -> ChatService<InMemoryConversationRepository> {
        let settings = ChatSettings {
            failure_policy: policy,
            ..ChatSettings::default()
        };
        ChatService::new(
            InMemoryConversationRepository::new(),
            BoxReplyGenerator::new(generator),
            settings,
        )
    }

    fn request(user: i64, conversation: Option<i64>, message: &str) -> ChatRequest {
        ChatRequest {
            user_id: UserId(user),
            conversation_id: conversation.map(ConversationId),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_conversation_scenario() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);

        let reply = service.send_message(request(1, None, "hi")).await.unwrap();
        assert_eq!(reply.user_message, "hi");
        assert_eq!(reply.ai_response, "You said: hi");

        let messages = service.list_messages(reply.conversation_id).await.unwrap();
        let senders: Vec<Sender> = messages.iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
    }

    #[tokio::test]
    async fn test_null_conversation_always_allocates_fresh_id() {
        for policy in [FailurePolicy::Atomic, FailurePolicy::KeepUserMessage] {
            let service = service_with(EchoGenerator, policy);
            let mut seen = HashSet::new();
            for i in 0..10 {
                let reply = service
                    .send_message(request(1, None, &format!("msg {i}")))
                    .await
                    .unwrap();
                assert!(seen.insert(reply.conversation_id), "reused id under {policy}");
            }
        }
    }

    #[tokio::test]
    async fn test_continuing_conversation_passes_full_history() {
        let generator = RecordingGenerator::default();
        let service = service_with(generator.clone(), FailurePolicy::Atomic);

        let first = service.send_message(request(1, None, "one")).await.unwrap();
        let second = service
            .send_message(request(1, Some(first.conversation_id.0), "two"))
            .await
            .unwrap();
        assert_eq!(second.conversation_id, first.conversation_id);

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![HistoryTurn::user("one")]);
        assert_eq!(
            seen[1],
            vec![
                HistoryTurn::user("one"),
                HistoryTurn::bot("reply #1"),
                HistoryTurn::user("two"),
            ]
        );

        let messages = service.list_messages(first.conversation_id).await.unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[tokio::test]
    async fn test_keep_user_message_history_matches_atomic() {
        let generator = RecordingGenerator::default();
        let service = service_with(generator.clone(), FailurePolicy::KeepUserMessage);

        let first = service.send_message(request(1, None, "one")).await.unwrap();
        service
            .send_message(request(1, Some(first.conversation_id.0), "two"))
            .await
            .unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 3);
        assert_eq!(seen[1][2], HistoryTurn::user("two"));
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);
        let err = service
            .send_message(request(1, Some(999), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
    }

    #[tokio::test]
    async fn test_other_users_conversation_is_not_found() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);
        let reply = service.send_message(request(1, None, "mine")).await.unwrap();

        let err = service
            .send_message(request(2, Some(reply.conversation_id.0), "intrude"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
        assert_eq!(service.list_messages(reply.conversation_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);

        let err = service.send_message(request(1, None, "   ")).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = service.send_message(request(0, None, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let long = "x".repeat(ChatSettings::default().max_message_chars + 1);
        let err = service.send_message(request(1, None, &long)).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        assert!(service.list_conversations(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_failure_writes_nothing() {
        let service = service_with(FailingGenerator, FailurePolicy::Atomic);

        let err = service.send_message(request(1, None, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(GenerationError::Unavailable(_))));
        assert!(service.list_conversations(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_failure_on_existing_conversation_adds_nothing() {
        let service = service_with(FailingGenerator, FailurePolicy::Atomic);
        let conversation = service.create_conversation(UserId(1)).await.unwrap();

        let err = service
            .send_message(request(1, Some(conversation.id.0), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
        assert!(service.list_messages(conversation.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keep_user_message_failure_leaves_user_turn() {
        let service = service_with(FailingGenerator, FailurePolicy::KeepUserMessage);

        let err = service.send_message(request(1, None, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));

        let conversations = service.list_conversations(UserId(1)).await.unwrap();
        assert_eq!(conversations.len(), 1);
        let messages = service.list_messages(conversations[0].id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let settings = ChatSettings {
            generation_timeout: Duration::from_millis(20),
            ..ChatSettings::default()
        };
        let service = ChatService::new(
            InMemoryConversationRepository::new(),
            BoxReplyGenerator::new(SlowGenerator(Duration::from_secs(5))),
            settings,
        );

        let err = service.send_message(request(1, None, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(GenerationError::Timeout(_))));
        assert!(service.list_conversations(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_is_generation_error() {
        let service = service_with(BlankGenerator, FailurePolicy::Atomic);
        let err = service.send_message(request(1, None, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(GenerationError::EmptyReply)));
    }

    #[tokio::test]
    async fn test_list_messages_is_idempotent() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);
        let reply = service.send_message(request(1, None, "hi")).await.unwrap();

        let a = service.list_messages(reply.conversation_id).await.unwrap();
        let b = service.list_messages(reply.conversation_id).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_post_message_validates_and_appends() {
        let service = service_with(EchoGenerator, FailurePolicy::Atomic);
        let conversation = service.create_conversation(UserId(3)).await.unwrap();

        let msg = service
            .post_message(conversation.id, Sender::Bot, "welcome")
            .await
            .unwrap();
        assert_eq!(msg.sender, Sender::Bot);

        let err = service
            .post_message(conversation.id, Sender::User, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = service
            .post_message(ConversationId(404), Sender::User, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
    }
}
