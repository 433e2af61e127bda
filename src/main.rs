mod agent;
mod config;
mod errors;
mod locale;
mod models;
mod routes;
mod service;
mod store;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::gemini::GeminiBackend;
use crate::agent::RelayGateway;
use crate::config::AppConfig;
use crate::service::chat_service::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webinar_chat_relay=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; chat replies will report the missing key");
    }

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let backend = GeminiBackend::new(config.api_key.as_deref(), &config.model, config.temperature)?;
    let gateway = RelayGateway::new(Arc::new(backend), config.session.locale.phrases());
    let chat_service = ChatService::new(Arc::new(gateway), config.session);

    // ── Router ────────────────────────────────────────────────────────────────
    let app = routes::router(chat_service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
