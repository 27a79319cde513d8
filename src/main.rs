use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookline::registry::Registry;
use hookline::server::{health_handler, webhook_handler, AppState};

/// Descriptor URI for the receiver. Example:
/// `github://?secret=s33kret&ref=refs/heads/main`
const ENV_RECEIVER: &str = "HOOKLINE_RECEIVER";

/// Comma-separated descriptor URIs for the transformations, applied in
/// order. Example: `githubcommits://?prepend_message=true`
const ENV_TRANSFORMATIONS: &str = "HOOKLINE_TRANSFORMATIONS";

/// Listen address, e.g. `0.0.0.0:8080`.
const ENV_ADDR: &str = "HOOKLINE_ADDR";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hookline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Registry::with_defaults();

    let receiver_uri =
        std::env::var(ENV_RECEIVER).unwrap_or_else(|_| "github://?secret=".to_string());
    let receiver = registry
        .receiver(&receiver_uri)
        .expect("invalid receiver descriptor");

    let transformer_uris =
        std::env::var(ENV_TRANSFORMATIONS).unwrap_or_else(|_| "githubcommits://".to_string());
    let transformers = transformer_uris
        .split(',')
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .map(|uri| {
            registry
                .transformer(uri)
                .expect("invalid transformation descriptor")
        })
        .collect();

    let shutdown = CancellationToken::new();
    let state = AppState::new(receiver, transformers, shutdown.clone());

    let app = Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr: SocketAddr = std::env::var(ENV_ADDR)
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .expect("invalid listen address");
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install signal handler");
        shutdown.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .unwrap();
}
