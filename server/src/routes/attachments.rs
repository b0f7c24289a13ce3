//! Attachment and upload-file passthrough routes.
//!
//! DESIGN
//! ======
//! The server never interprets uploaded bytes: files are buffered off the
//! incoming multipart stream and re-sent to the upstream under the same
//! `files` field, with filename and content type preserved. Both routes
//! require the upstream to be configured; the mock responder has no file
//! storage.

use axum::Json;
use axum::extract::{Multipart, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use protocol::ErrorReply;
use tracing::info;

use crate::routes::chat::chat_error_response;
use crate::services::upstream::AttachmentPart;
use crate::state::AppState;

const FILES_FIELD: &str = "files";

/// `POST /api/v1/attachments/{identifier}/{chat_id}` — forward uploads.
pub async fn upload_attachments(
    State(state): State<AppState>,
    Path((identifier, chat_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Response {
    let Some(upstream) = state.upstream.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "attachment forwarding is not configured");
    };

    let parts = match collect_files(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    if parts.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Bad Request");
    }

    info!(workflow = %identifier, chat = %chat_id, files = parts.len(), "forwarding attachments");
    match upstream.forward_attachments(&identifier, &chat_id, parts).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => chat_error_response(&err),
    }
}

/// `GET /api/v1/get-upload-file` — query passthrough.
pub async fn get_upload_file(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let Some(upstream) = state.upstream.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "upload-file passthrough is not configured");
    };

    match upstream.get_upload_file(query.as_deref()).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => chat_error_response(&err),
    }
}

async fn collect_files(mut multipart: Multipart) -> Result<Vec<AttachmentPart>, Response> {
    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(error_response(StatusCode::BAD_REQUEST, &err.to_string())),
        };
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("file").to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        match field.bytes().await {
            Ok(bytes) => parts.push(AttachmentPart { filename, content_type, bytes: bytes.to_vec() }),
            Err(err) => return Err(error_response(StatusCode::BAD_REQUEST, &err.to_string())),
        }
    }
    Ok(parts)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorReply { error: message.to_owned() })).into_response()
}
