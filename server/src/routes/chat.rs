//! Conversation routes — the two turn-protocol endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use protocol::{ContinueChatRequest, ErrorReply, StartChatRequest};
use tracing::info;

use crate::services::responder::ChatError;
use crate::state::AppState;

/// `POST /api/v1/start-chat/{identifier}` — open a session.
pub async fn start_chat(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Json(body): Json<StartChatRequest>,
) -> Response {
    info!(workflow = %identifier, "start-chat");
    match state.responder.start_chat(&identifier, &body).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => chat_error_response(&err),
    }
}

/// `POST /api/v1/continue-chat/{identifier}` — advance a session one turn.
pub async fn continue_chat(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Json(body): Json<ContinueChatRequest>,
) -> Response {
    info!(workflow = %identifier, session = %body.chat_session_id, "continue-chat");
    match state.responder.continue_chat(&identifier, &body).await {
        Ok(node) => Json(node).into_response(),
        Err(err) => chat_error_response(&err),
    }
}

/// Status code for a responder failure. The body is always a flat
/// `{error}` object; drivers key on the body, the status is advisory.
pub(crate) fn chat_error_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::SessionNotFound(_) | ChatError::TokenMismatch => StatusCode::NOT_FOUND,
        // Upstream application errors pass through the way the upstream
        // sent them: a 200 with an `{error}` body.
        ChatError::Application(_) => StatusCode::OK,
        ChatError::UpstreamStatus { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        ChatError::UpstreamRequest(_) | ChatError::UpstreamParse(_) | ChatError::ClientBuild(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

pub(crate) fn chat_error_response(err: &ChatError) -> Response {
    (chat_error_status(err), Json(ErrorReply { error: err.to_string() })).into_response()
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
