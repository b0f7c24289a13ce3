//! Transport — how the driver reaches a responder.
//!
//! `ChatTransport` is the seam between the state machine and the wire;
//! tests script it, production uses the reqwest-backed [`HttpTransport`]
//! against the widget server. Pure parsing lives in `parse_reply`.

use std::time::Duration;

use async_trait::async_trait;
use protocol::{ContinueChatRequest, ErrorReply, NodeResponse, StartChatReply, StartChatRequest};
use serde::de::DeserializeOwned;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Failures while exchanging a turn with the responder.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (network failure, timeout).
    #[error("request failed: {0}")]
    Request(String),
    /// The responder answered with a flat `{error}` body.
    #[error("{0}")]
    Application(String),
    /// Non-success status without an `{error}` body.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },
    /// The body could not be decoded as the expected reply.
    #[error("response parse failed: {0}")]
    Parse(String),
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl TransportError {
    /// Application-level errors carry responder-authored text and are
    /// surfaced verbatim; everything else gets a generic retry notice.
    #[must_use]
    pub fn application_message(&self) -> Option<&str> {
        match self {
            Self::Application(message) => Some(message),
            _ => None,
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// One protocol hop: start a session or advance it by a turn.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn start_chat(&self, req: &StartChatRequest) -> Result<StartChatReply, TransportError>;

    /// Must present `Authorization: Bearer {chatToken}` on the wire.
    async fn continue_chat(&self, req: &ContinueChatRequest) -> Result<NodeResponse, TransportError>;
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

/// reqwest-backed transport against a widget server base URL.
pub struct HttpTransport {
    http: reqwest::Client,
    api_url: String,
}

impl HttpTransport {
    /// Build a transport for `api_url` (no trailing slash required).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the HTTP client cannot
    /// be constructed.
    pub fn new(api_url: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        let api_url = api_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, api_url })
    }

    async fn post<B, T>(&self, url: &str, body: &B, bearer: Option<&str>) -> Result<T, TransportError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        parse_reply(status, &text)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn start_chat(&self, req: &StartChatRequest) -> Result<StartChatReply, TransportError> {
        let url = format!("{}/api/v1/start-chat/{}", self.api_url, req.workflow_id);
        self.post(&url, req, None).await
    }

    async fn continue_chat(&self, req: &ContinueChatRequest) -> Result<NodeResponse, TransportError> {
        let url = format!("{}/api/v1/continue-chat/{}", self.api_url, req.workflow_id);
        self.post(&url, req, Some(&req.chat_token)).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a responder reply, surfacing `{error}` bodies as application
/// errors whatever the status code says.
fn parse_reply<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, TransportError> {
    if let Ok(reply) = serde_json::from_str::<ErrorReply>(body) {
        return Err(TransportError::Application(reply.error));
    }
    if !(200..300).contains(&status) {
        return Err(TransportError::Status { status, body: body.to_owned() });
    }
    serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
