//! HTTP transport to the chat endpoint

use super::types::{ChatReply, ChatRequest, ChatResponseBody};
use super::{ChatTransport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::time::Duration;

/// Client-side ceiling; the session enforces the per-attempt deadline itself.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// `POST {endpoint}/chat` over reqwest
pub struct HttpTransport {
    client: Client,
    chat_url: String,
    health_url: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        let base = endpoint.trim_end_matches('/');
        Ok(Self {
            client,
            chat_url: format!("{base}/chat"),
            health_url: format!("{base}/health"),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// `GET {endpoint}/health`, used by the connectivity probe
    pub async fn health(&self, timeout: Duration) -> Result<(), TransportError> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ))
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(format!("Request timeout: {e}"))
    } else if e.is_connect() && network_unreachable(&e) {
        TransportError::unreachable(format!("Network unreachable: {e}"))
    } else if e.is_connect() || e.is_request() {
        TransportError::connection(format!("Connection failed: {e}"))
    } else {
        TransportError::unknown(format!("Request failed: {e}"))
    }
}

/// Walk the error chain for a failure that happened before any host was
/// reached: name resolution, or no route to the network.
fn network_unreachable(error: &(dyn Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown
            ) {
                return true;
            }
        }
        // hyper-util's connector reports resolver failures as "dns error"
        if err.to_string().starts_with("dns error") {
            return true;
        }
        current = err.source();
    }
    false
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::connection(format!("Failed to read response: {e}")))?;

        let parsed: ChatResponseBody = serde_json::from_str(&body)
            .map_err(|e| TransportError::format(format!("Failed to parse response: {e}")))?;

        parsed
            .into_reply()
            .ok_or_else(|| TransportError::format("Invalid response format"))
    }
}
