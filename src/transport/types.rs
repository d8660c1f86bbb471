//! Wire types for the chat endpoint

use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Client clock, epoch milliseconds
    pub timestamp: i64,
    /// Context window, oldest first
    pub history: Vec<HistoryEntry>,
}

/// A validated bot reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
}

/// Raw response body. The server also sends `status` and `timestamp`,
/// which are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseBody {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl ChatResponseBody {
    /// The reply text, if present as a non-empty string
    pub fn into_reply(self) -> Option<ChatReply> {
        match self.response {
            Some(serde_json::Value::String(text)) if !text.is_empty() => Some(ChatReply { text }),
            _ => None,
        }
    }
}
