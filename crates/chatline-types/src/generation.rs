//! Input and error types for the reply-generation capability.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::{Message, Sender};

/// One entry of the history handed to a reply generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub sender: Sender,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
        }
    }
}

impl From<&Message> for HistoryTurn {
    fn from(m: &Message) -> Self {
        Self {
            sender: m.sender,
            content: m.content.clone(),
        }
    }
}

/// Failures of the reply-generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("reply generation timed out after {0}s")]
    Timeout(u64),

    #[error("reply generator unavailable: {0}")]
    Unavailable(String),

    #[error("reply generator rejected the request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed generator response: {0}")]
    Malformed(String),

    #[error("reply generator returned an empty reply")]
    EmptyReply,
}
