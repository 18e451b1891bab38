use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pasalive::{abuse, api, config::ServerConfig, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pasalive=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pasapalabra Live signaling server...");

    let config = ServerConfig::from_env();
    let addr = config.addr();

    let abuse_config = Arc::new(abuse::AbuseConfig::from_env());
    let state = Arc::new(AppState::new(config));

    // Periodically prune stale rate-limiter windows
    if let Some(rate_limiter) = abuse_config.rate_limiter.clone() {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                rate_limiter.cleanup().await;
            }
        });
    }

    // WebSocket route with anti-abuse protection
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            abuse_config.clone(),
            abuse::ws_abuse_middleware,
        ));

    let app = Router::new()
        .merge(ws_routes)
        .route("/api/health", get(api::health))
        .route("/api/webrtc-config", get(api::webrtc_config))
        .route("/api/media-token", get(api::media_token))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
