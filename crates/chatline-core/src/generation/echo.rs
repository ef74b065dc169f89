//! Deterministic offline generator, used when no API key is configured.

use chatline_types::chat::Sender;
use chatline_types::generation::{GenerationError, HistoryTurn};

use super::generator::ReplyGenerator;

/// Replies `"You said: <latest user message>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

impl ReplyGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, history: &[HistoryTurn]) -> Result<String, GenerationError> {
        let latest = history
            .iter()
            .rev()
            .find(|turn| turn.sender == Sender::User)
            .ok_or_else(|| GenerationError::Malformed("history has no user turn".to_string()))?;
        Ok(format!("You said: {}", latest.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_latest_user_turn() {
        let history = vec![
            HistoryTurn::user("first"),
            HistoryTurn::bot("You said: first"),
            HistoryTurn::user("second"),
        ];
        let reply = EchoGenerator.generate(&history).await.unwrap();
        assert_eq!(reply, "You said: second");
    }

    #[tokio::test]
    async fn test_empty_history_is_malformed() {
        let err = EchoGenerator.generate(&[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }
}
