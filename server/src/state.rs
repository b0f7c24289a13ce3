//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the responder behind its trait (mock or upstream proxy, chosen at
//! startup) and, when configured, the upstream client used directly by the
//! attachment passthrough routes.

use std::sync::Arc;

use crate::services::responder::Responder;
use crate::services::upstream::UpstreamClient;

/// Shared application state. Clone is required by Axum — all inner fields
/// are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<dyn Responder>,
    /// Present only when `API_HOST`/`MY_API_KEY` are configured; attachment
    /// routes answer 503 without it.
    pub upstream: Option<Arc<UpstreamClient>>,
}

impl AppState {
    #[must_use]
    pub fn new(responder: Arc<dyn Responder>, upstream: Option<Arc<UpstreamClient>>) -> Self {
        Self { responder, upstream }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
