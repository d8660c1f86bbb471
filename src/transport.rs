//! Chat endpoint transport
//!
//! A common interface for sending one exchange to the server, plus the
//! connectivity flag consulted when classifying failures.

pub mod connectivity;
mod error;
pub mod http;
mod types;

pub use connectivity::NetworkStatus;
pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use types::{ChatReply, ChatRequest};

use async_trait::async_trait;
use std::sync::Arc;

/// Sends a single chat request and returns the validated reply
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        (**self).send(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: ChatTransport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ChatTransport> ChatTransport for LoggingTransport<T> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    context_entries = request.history.len(),
                    reply_len = reply.text.len(),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Chat request failed"
                );
            }
        }

        result
    }
}
