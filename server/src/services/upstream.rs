//! Upstream workflow API client — the reverse-proxy half of the server.
//!
//! Thin reqwest wrapper around the upstream's `start-chat`, `continue-chat`,
//! attachment, and upload-file endpoints. The widget's per-session token is
//! never forwarded; every upstream call authenticates with the server's own
//! API key. Pure parsing lives in `parse_reply` for testability.

use std::time::Duration;

use protocol::{ContinueChatRequest, ErrorReply, NodeResponse, StartChatReply, StartChatRequest};
use serde::de::DeserializeOwned;

use crate::services::responder::{ChatError, Responder};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

/// One uploaded file, buffered in memory for forwarding.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Build a client against `base_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: String, api_key: String) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatError::ClientBuild(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, api_key })
    }

    /// Forward a `start-chat` request.
    ///
    /// # Errors
    ///
    /// Transport, status, and parse failures map to the corresponding
    /// [`ChatError`] variants; `{error}` bodies become
    /// [`ChatError::Application`].
    pub async fn start_chat(
        &self,
        workflow_id: &str,
        req: &StartChatRequest,
    ) -> Result<StartChatReply, ChatError> {
        let url = format!("{}/api/v1/start-chat/{workflow_id}", self.base_url);
        let (status, body) = self.post_json(&url, req).await?;
        parse_reply(status, &body)
    }

    /// Forward a `continue-chat` request.
    ///
    /// # Errors
    ///
    /// Same contract as [`UpstreamClient::start_chat`].
    pub async fn continue_chat(
        &self,
        workflow_id: &str,
        req: &ContinueChatRequest,
    ) -> Result<NodeResponse, ChatError> {
        let url = format!("{}/api/v1/continue-chat/{workflow_id}", self.base_url);
        let (status, body) = self.post_json(&url, req).await?;
        parse_reply(status, &body)
    }

    /// Forward uploaded files as a rebuilt multipart body. File bytes are
    /// passed through untouched.
    ///
    /// # Errors
    ///
    /// Transport and status failures map to [`ChatError`]; the upstream's
    /// JSON reply is returned verbatim.
    pub async fn forward_attachments(
        &self,
        workflow_id: &str,
        chat_id: &str,
        parts: Vec<AttachmentPart>,
    ) -> Result<serde_json::Value, ChatError> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let file = reqwest::multipart::Part::bytes(part.bytes)
                .file_name(part.filename)
                .mime_str(&part.content_type)
                .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
            form = form.part("files", file);
        }

        let url = format!("{}/api/v1/attachments/{workflow_id}/{chat_id}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        parse_reply(status, &body)
    }

    /// Pass a `get-upload-file` query through to the upstream.
    ///
    /// # Errors
    ///
    /// Transport and status failures map to [`ChatError`].
    pub async fn get_upload_file(&self, raw_query: Option<&str>) -> Result<serde_json::Value, ChatError> {
        let mut url = format!("{}/api/v1/get-upload-file", self.base_url);
        if let Some(query) = raw_query {
            url.push('?');
            url.push_str(query);
        }
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        parse_reply(status, &body)
    }

    async fn post_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<(u16, String), ChatError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::UpstreamRequest(e.to_string()))?;
        Ok((status, text))
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode an upstream reply into `T`, surfacing `{error}` bodies and
/// non-success statuses as typed errors.
fn parse_reply<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ChatError> {
    if let Ok(reply) = serde_json::from_str::<ErrorReply>(body) {
        return Err(ChatError::Application(reply.error));
    }
    if !(200..300).contains(&status) {
        return Err(ChatError::UpstreamStatus { status, body: body.to_owned() });
    }
    serde_json::from_str(body).map_err(|e| ChatError::UpstreamParse(e.to_string()))
}

// =============================================================================
// RESPONDER ADAPTER
// =============================================================================

/// `Responder` implementation that defers every turn to the upstream API.
pub struct UpstreamResponder {
    client: std::sync::Arc<UpstreamClient>,
}

impl UpstreamResponder {
    #[must_use]
    pub fn new(client: std::sync::Arc<UpstreamClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Responder for UpstreamResponder {
    async fn start_chat(
        &self,
        workflow_id: &str,
        req: &StartChatRequest,
    ) -> Result<StartChatReply, ChatError> {
        self.client.start_chat(workflow_id, req).await
    }

    async fn continue_chat(
        &self,
        workflow_id: &str,
        req: &ContinueChatRequest,
    ) -> Result<NodeResponse, ChatError> {
        self.client.continue_chat(workflow_id, req).await
    }
}

#[cfg(test)]
#[path = "upstream_test.rs"]
mod tests;
