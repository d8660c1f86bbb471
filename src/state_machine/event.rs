//! Events that can occur in a session

use super::state::ErrorKind;
use crate::transport::{TransportError, TransportErrorKind};

pub const TIMEOUT_NOTICE: &str = "Request timed out. Please check your connection and try again.";
pub const OFFLINE_NOTICE: &str = "You appear to be offline. Please check your internet connection.";
pub const SERVER_ERROR_NOTICE: &str = "Server error. Please try again in a moment.";
pub const UNAVAILABLE_NOTICE: &str = "Service unavailable. Please refresh the page.";
pub const GENERIC_NOTICE: &str = "Sorry, something went wrong. Please try again.";

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
    },

    // Transport events
    ReplyReceived {
        reply: String,
        /// Epoch milliseconds at which the reply arrived
        received_at: i64,
    },
    ExchangeFailed {
        failure: ExchangeFailure,
        attempt: u32,
    },
    RetryTimeout {
        attempt: u32,
    },
}

/// A failed attempt, with the connectivity flag sampled when it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub kind: TransportErrorKind,
    pub message: String,
    pub offline: bool,
}

impl ExchangeFailure {
    pub fn from_transport(error: TransportError, online: bool) -> Self {
        Self {
            kind: error.kind,
            message: error.message,
            offline: !online,
        }
    }

    /// Whether this failure is eligible for retry.
    ///
    /// Connectivity-class errors, any error whose text mentions "fetch" or
    /// "network", and any failure while offline. Timeouts are not transient
    /// unless one of those also holds.
    pub fn is_transient(&self) -> bool {
        self.kind.is_connectivity()
            || self.message.contains("fetch")
            || self.message.contains("network")
            || self.offline
    }

    /// User-facing message for a failure that will not be retried
    pub fn notice(&self) -> &'static str {
        if self.kind.is_timeout_or_cancel() {
            TIMEOUT_NOTICE
        } else if self.offline {
            OFFLINE_NOTICE
        } else {
            match self.kind {
                TransportErrorKind::Status(500..=599) => SERVER_ERROR_NOTICE,
                TransportErrorKind::Status(404) => UNAVAILABLE_NOTICE,
                _ => GENERIC_NOTICE,
            }
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        if self.is_transient() {
            return ErrorKind::Network;
        }
        match self.kind {
            TransportErrorKind::Timeout | TransportErrorKind::Cancelled => ErrorKind::Timeout,
            TransportErrorKind::Status(_) => ErrorKind::Server,
            TransportErrorKind::Format => ErrorKind::Format,
            TransportErrorKind::Connection
            | TransportErrorKind::Unreachable
            | TransportErrorKind::Unknown => ErrorKind::Unknown,
        }
    }
}
