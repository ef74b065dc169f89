//! Application state wiring the chat service to its store and generator.
//!
//! AppState is built once in `main` and handed to CLI commands directly and
//! to HTTP handlers through axum's `State` extractor. `ChatService` is generic
//! over the repository trait; AppState pins it to [`ConversationStore`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use chatline_core::chat::service::{ChatService, ChatSettings};
use chatline_core::generation::box_generator::BoxReplyGenerator;
use chatline_infra::generation::{build_generator, resolve_api_key};
use chatline_infra::store::ConversationStore;
use chatline_types::config::GlobalConfig;

pub type ConcreteChatService = ChatService<ConversationStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the configured store and reply generator.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let store = ConversationStore::open(&config.storage, &data_dir)
            .await
            .context("failed to open conversation store")?;
        let generator = build_generator(&config.generator, resolve_api_key());

        Ok(Self::from_parts(store, generator, config, data_dir))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        store: ConversationStore,
        generator: BoxReplyGenerator,
        config: GlobalConfig,
        data_dir: PathBuf,
    ) -> Self {
        let settings = ChatSettings::from_config(&config.chat, &config.generator);
        Self {
            chat_service: Arc::new(ChatService::new(store, generator, settings)),
            config: Arc::new(config),
            data_dir,
        }
    }
}
