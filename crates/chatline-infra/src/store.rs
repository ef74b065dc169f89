//! Runtime selection between the durable and in-memory conversation stores.

use std::path::Path;

use tracing::info;

use chatline_core::chat::memory_store::InMemoryConversationRepository;
use chatline_core::chat::repository::ConversationRepository;
use chatline_types::chat::{
    Conversation, ConversationId, Exchange, ExchangeTarget, Message, Sender, UserId,
};
use chatline_types::config::{StorageBackend, StorageConfig};
use chatline_types::error::RepositoryError;

use crate::sqlite::conversation::SqliteConversationRepository;
use crate::sqlite::pool::{DatabasePool, default_database_url};

/// The conversation store chosen by `[storage] backend`.
///
/// `ConversationRepository` uses RPITIT and is not object-safe, so the
/// choice is an enum that delegates.
#[derive(Clone)]
pub enum ConversationStore {
    Sqlite(SqliteConversationRepository),
    Memory(InMemoryConversationRepository),
}

impl ConversationStore {
    /// Open the configured backend, running migrations for SQLite.
    pub async fn open(config: &StorageConfig, data_dir: &Path) -> Result<Self, sqlx::Error> {
        match config.backend {
            StorageBackend::Memory => {
                info!("Using in-memory conversation store (not durable)");
                Ok(Self::Memory(InMemoryConversationRepository::new()))
            }
            StorageBackend::Sqlite => {
                let url = config
                    .database_url
                    .clone()
                    .unwrap_or_else(|| default_database_url(data_dir));
                let pool = DatabasePool::new(&url, config.read_connections).await?;
                info!(url = %url, "Using SQLite conversation store");
                Ok(Self::Sqlite(SqliteConversationRepository::new(pool)))
            }
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::Sqlite(_) => StorageBackend::Sqlite,
            Self::Memory(_) => StorageBackend::Memory,
        }
    }
}

impl ConversationRepository for ConversationStore {
    async fn create_conversation(&self, user_id: UserId) -> Result<Conversation, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.create_conversation(user_id).await,
            Self::Memory(repo) => repo.create_conversation(user_id).await,
        }
    }

    async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.get_conversation(conversation_id).await,
            Self::Memory(repo) => repo.get_conversation(conversation_id).await,
        }
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.append_message(conversation_id, sender, content).await,
            Self::Memory(repo) => repo.append_message(conversation_id, sender, content).await,
        }
    }

    async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.list_conversations(user_id).await,
            Self::Memory(repo) => repo.list_conversations(user_id).await,
        }
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.list_messages(conversation_id).await,
            Self::Memory(repo) => repo.list_messages(conversation_id).await,
        }
    }

    async fn record_exchange(
        &self,
        target: ExchangeTarget,
        user_content: &str,
        bot_content: &str,
    ) -> Result<Exchange, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.record_exchange(target, user_content, bot_content).await,
            Self::Memory(repo) => repo.record_exchange(target, user_content, bot_content).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let store = ConversationStore::open(&config, Path::new("/nonexistent"))
            .await
            .unwrap();
        assert_eq!(store.backend(), StorageBackend::Memory);

        let conv = store.create_conversation(UserId(1)).await.unwrap();
        assert!(store.list_messages(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_sqlite_backend_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::open(&StorageConfig::default(), dir.path())
            .await
            .unwrap();
        assert_eq!(store.backend(), StorageBackend::Sqlite);
        assert!(dir.path().join("chatline.db").exists());

        let exchange = store
            .record_exchange(ExchangeTarget::New(UserId(1)), "hi", "hello")
            .await
            .unwrap();
        let listed = store.list_conversations(UserId(1)).await.unwrap();
        assert_eq!(listed, vec![exchange.conversation]);
    }

    mod service_over_sqlite {
        use super::*;
        use std::sync::Arc;

        use chatline_core::chat::service::{ChatService, ChatSettings};
        use chatline_core::generation::box_generator::BoxReplyGenerator;
        use chatline_core::generation::echo::EchoGenerator;
        use chatline_core::generation::generator::ReplyGenerator;
        use chatline_types::chat::ChatRequest;
        use chatline_types::config::FailurePolicy;
        use chatline_types::error::ChatError;
        use chatline_types::generation::{GenerationError, HistoryTurn};

        struct FailingGenerator;

        impl ReplyGenerator for FailingGenerator {
            fn name(&self) -> &str {
                "failing"
            }

            async fn generate(&self, _history: &[HistoryTurn]) -> Result<String, GenerationError> {
                Err(GenerationError::Unavailable("connection refused".to_string()))
            }
        }

        async fn sqlite_store(dir: &tempfile::TempDir) -> ConversationStore {
            ConversationStore::open(&StorageConfig::default(), dir.path())
                .await
                .unwrap()
        }

        fn chat_service(
            store: ConversationStore,
            generator: BoxReplyGenerator,
            failure_policy: FailurePolicy,
        ) -> ChatService<ConversationStore> {
            let settings = ChatSettings {
                failure_policy,
                ..ChatSettings::default()
            };
            ChatService::new(store, generator, settings)
        }

        fn request(user_id: i64, conversation_id: Option<ConversationId>, message: &str) -> ChatRequest {
            ChatRequest {
                user_id: UserId(user_id),
                conversation_id,
                message: message.to_string(),
            }
        }

        #[tokio::test]
        async fn test_atomic_failure_writes_nothing() {
            let dir = tempfile::tempdir().unwrap();
            let store = sqlite_store(&dir).await;
            let service = chat_service(
                store.clone(),
                BoxReplyGenerator::new(FailingGenerator),
                FailurePolicy::Atomic,
            );

            let err = service.send_message(request(1, None, "hi")).await.unwrap_err();
            assert!(matches!(err, ChatError::Generation(_)));
            assert!(store.list_conversations(UserId(1)).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_atomic_failure_leaves_existing_conversation_unchanged() {
            let dir = tempfile::tempdir().unwrap();
            let store = sqlite_store(&dir).await;
            let exchange = store
                .record_exchange(ExchangeTarget::New(UserId(1)), "first", "reply")
                .await
                .unwrap();
            let service = chat_service(
                store.clone(),
                BoxReplyGenerator::new(FailingGenerator),
                FailurePolicy::Atomic,
            );

            let id = exchange.conversation.id;
            assert!(service.send_message(request(1, Some(id), "second")).await.is_err());
            assert_eq!(store.list_messages(id).await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn test_keep_user_message_failure_keeps_user_turn() {
            let dir = tempfile::tempdir().unwrap();
            let store = sqlite_store(&dir).await;
            let service = chat_service(
                store.clone(),
                BoxReplyGenerator::new(FailingGenerator),
                FailurePolicy::KeepUserMessage,
            );

            assert!(service.send_message(request(1, None, "hi")).await.is_err());

            let conversations = store.list_conversations(UserId(1)).await.unwrap();
            assert_eq!(conversations.len(), 1);
            let messages = store.list_messages(conversations[0].id).await.unwrap();
            let senders: Vec<Sender> = messages.iter().map(|m| m.sender).collect();
            assert_eq!(senders, vec![Sender::User]);
            assert_eq!(messages[0].content, "hi");
        }

        #[tokio::test]
        async fn test_concurrent_exchanges_stay_paired_and_ordered() {
            let dir = tempfile::tempdir().unwrap();
            let store = sqlite_store(&dir).await;
            let service = Arc::new(chat_service(
                store.clone(),
                BoxReplyGenerator::new(EchoGenerator),
                FailurePolicy::Atomic,
            ));

            let first = service.send_message(request(1, None, "start")).await.unwrap();
            let id = first.conversation_id;

            let mut handles = Vec::new();
            for i in 0..12 {
                let service = service.clone();
                handles.push(tokio::spawn(async move {
                    service
                        .send_message(request(1, Some(id), &format!("message {i}")))
                        .await
                }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let messages = store.list_messages(id).await.unwrap();
            assert_eq!(messages.len(), 26);
            assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
            for pair in messages.chunks(2) {
                assert_eq!(pair[0].sender, Sender::User);
                assert_eq!(pair[1].sender, Sender::Bot);
                assert_eq!(pair[1].content, format!("You said: {}", pair[0].content));
            }
        }
    }
}
