//! ReplyGenerator trait definition.
//!
//! The external collaborator that turns a conversation history into the
//! assistant's reply. Its internals are opaque to the chat service.

use chatline_types::generation::{GenerationError, HistoryTurn};

/// Trait for reply-generation backends.
///
/// Uses native async fn in traits (RPITIT). Implementations live in
/// chatline-infra (e.g., `OpenAiCompatibleGenerator`) and in this crate
/// (`EchoGenerator`).
pub trait ReplyGenerator: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Produce the reply to the last turn of `history`.
    ///
    /// `history` is in conversation order and ends with the user message
    /// being answered.
    fn generate(
        &self,
        history: &[HistoryTurn],
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;
}
