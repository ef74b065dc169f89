//! BoxReplyGenerator -- object-safe dynamic dispatch wrapper for ReplyGenerator.
//!
//! 1. Define an object-safe `ReplyGeneratorDyn` trait with boxed futures
//! 2. Blanket-impl `ReplyGeneratorDyn` for all `T: ReplyGenerator`
//! 3. `BoxReplyGenerator` wraps `Box<dyn ReplyGeneratorDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use chatline_types::generation::{GenerationError, HistoryTurn};

use super::generator::ReplyGenerator;

/// Object-safe version of [`ReplyGenerator`] with boxed futures.
pub trait ReplyGeneratorDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        history: &'a [HistoryTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;
}

impl<T: ReplyGenerator> ReplyGeneratorDyn for T {
    fn name(&self) -> &str {
        ReplyGenerator::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        history: &'a [HistoryTurn],
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>> {
        Box::pin(self.generate(history))
    }
}

/// Type-erased reply generator, selected at runtime from configuration.
pub struct BoxReplyGenerator {
    inner: Box<dyn ReplyGeneratorDyn>,
}

impl BoxReplyGenerator {
    pub fn new<T: ReplyGenerator + 'static>(generator: T) -> Self {
        Self {
            inner: Box::new(generator),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn generate(&self, history: &[HistoryTurn]) -> Result<String, GenerationError> {
        self.inner.generate_boxed(history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::echo::EchoGenerator;

    #[tokio::test]
    async fn test_box_delegates_to_inner() {
        let boxed = BoxReplyGenerator::new(EchoGenerator);
        assert_eq!(boxed.name(), "echo");
        let reply = boxed.generate(&[HistoryTurn::user("ping")]).await.unwrap();
        assert_eq!(reply, "You said: ping");
    }
}
