//! Transport error types

use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unreachable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Cancelled, message)
    }

    pub fn status(code: u16, reason: &str) -> Self {
        Self::new(
            TransportErrorKind::Status(code),
            format!("HTTP {code}: {reason}"),
        )
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Format, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }
}

/// Error classification for retry and notice selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused/reset, request never left the client
    Connection,
    /// Name resolution failed or the network itself is down
    Unreachable,
    /// The attempt exceeded its deadline
    Timeout,
    /// The attempt was cancelled before completing
    Cancelled,
    /// Non-success HTTP status
    Status(u16),
    /// Body missing, unparseable, or without a usable reply
    Format,
    /// Anything else reported by the HTTP stack
    Unknown,
}

impl TransportErrorKind {
    /// Connectivity-class failures, the only kinds retried on their own merit
    pub fn is_connectivity(self) -> bool {
        matches!(self, Self::Connection | Self::Unreachable)
    }

    /// The device has no usable network, as opposed to the server being
    /// slow, refusing, or failing
    pub fn is_network_down(self) -> bool {
        matches!(self, Self::Unreachable)
    }

    pub fn is_timeout_or_cancel(self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}
