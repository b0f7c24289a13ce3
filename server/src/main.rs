mod config;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::responder::{MockResponder, Responder};
use services::session::{SessionStore, spawn_eviction_task};
use services::upstream::{UpstreamClient, UpstreamResponder};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    // Upstream client is built whenever credentials exist, even in mock
    // mode: attachments are always forwarded, never mocked.
    let upstream = match (&config.api_host, &config.api_key) {
        (Some(host), Some(key)) => Some(Arc::new(
            UpstreamClient::new(host.clone(), key.clone()).expect("upstream client build failed"),
        )),
        _ => None,
    };

    let sessions = SessionStore::new(config.session_ttl);
    let responder: Arc<dyn Responder> = if config.use_mock {
        tracing::info!("mock responder enabled");
        let _eviction = spawn_eviction_task(sessions.clone(), config.sweep_interval);
        Arc::new(MockResponder::new(sessions.clone()))
    } else {
        let client = upstream.clone().expect("proxy mode requires API_HOST and MY_API_KEY");
        tracing::info!(api_host = config.api_host.as_deref().unwrap_or_default(), "proxying to upstream");
        Arc::new(UpstreamResponder::new(client))
    };

    let state = state::AppState::new(responder, upstream);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, mock = config.use_mock, "chat server listening");
    axum::serve(listener, app).await.expect("server failed");
}
