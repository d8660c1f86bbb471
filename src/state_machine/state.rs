//! Session state types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure taxonomy for exchanges that ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connectivity-class failure that exhausted its retries
    Network,
    /// Deadline exceeded or request cancelled
    Timeout,
    /// Non-success HTTP status
    Server,
    /// Missing or invalid reply field
    Format,
    Unknown,
}

/// Who wrote a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Bot,
}

/// Session state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for user input, nothing sent yet
    #[default]
    Idle,

    /// Request in flight. `retries` counts retries already made.
    Sending { message: String, retries: u32 },

    /// Waiting out the backoff before the next attempt
    RetryScheduled {
        message: String,
        retries: u32,
        delay_ms: u64,
    },

    /// Last exchange completed; ready for input
    Success,

    /// Last exchange failed; ready for input
    Failed { notice: String, error_kind: ErrorKind },
}

impl SessionState {
    /// True while an exchange is in flight or waiting to retry
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            SessionState::Sending { .. } | SessionState::RetryScheduled { .. }
        )
    }

    /// Short name for logs and state-change notifications
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Sending { .. } => "sending",
            SessionState::RetryScheduled { .. } => "retry_scheduled",
            SessionState::Success => "success",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Limits governing a session (immutable configuration)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Longest accepted message, in UTF-16 code units
    pub max_message_length: usize,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Backoff unit; retry n waits `n * retry_base_delay`
    pub retry_base_delay: Duration,
    /// Hard deadline for each attempt
    pub request_timeout: Duration,
    /// History entries retained
    pub history_limit: usize,
    /// History entries sent with each request
    pub context_window: usize,
    /// How long notices stay visible
    pub notice_ttl: Duration,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            max_message_length: 500,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            history_limit: crate::history::MAX_HISTORY_ENTRIES,
            context_window: crate::history::CONTEXT_WINDOW,
            notice_ttl: Duration::from_secs(5),
        }
    }
}

impl SessionContext {
    /// Backoff before retry number `retry` (1-based)
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.retry_base_delay * retry
    }
}
