//! Effects produced by state transitions

use super::state::Author;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the rendered transcript
    RenderMessage { text: String, author: Author },

    /// Show a transient, auto-dismissing notice
    ShowNotice { text: String },

    /// Empty the input buffer
    ClearInput,

    /// Disable (true) or re-enable (false) input
    SetProcessing(bool),

    ShowTyping,

    HideTyping,

    /// Send one attempt of the exchange
    SendRequest { message: String, attempt: u32 },

    /// Wake the session after `delay` for retry `attempt`
    ScheduleRetry { delay: Duration, attempt: u32 },

    /// Append a completed exchange to history and persist it
    RecordExchange {
        user: String,
        bot: String,
        timestamp: i64,
    },
}

impl Effect {
    pub fn render_user(text: impl Into<String>) -> Self {
        Effect::RenderMessage {
            text: text.into(),
            author: Author::User,
        }
    }

    pub fn render_bot(text: impl Into<String>) -> Self {
        Effect::RenderMessage {
            text: text.into(),
            author: Author::Bot,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Effect::ShowNotice { text: text.into() }
    }
}
