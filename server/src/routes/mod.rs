//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server is a thin boundary in front of a responder: two conversation
//! endpoints, two file passthroughs, and a health probe. CORS is wide open
//! because the widget embeds on arbitrary host pages.

pub mod attachments;
pub mod chat;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/start-chat/{identifier}", post(chat::start_chat))
        .route("/api/v1/continue-chat/{identifier}", post(chat::continue_chat))
        .route("/api/v1/attachments/{identifier}/{chat_id}", post(attachments::upload_attachments))
        .route("/api/v1/get-upload-file", get(attachments::get_upload_file))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
