// rest_api/src/lib.rs

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::future::Future;

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lib::config::AppConfig;

pub use error::RestApiError;
pub use state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(allowed)
}

/// The complete HTTP application.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let max_upload_bytes = state.config.files.max_upload_bytes;
    Router::new()
        .nest("/api/v1", routes::api_routes(max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serves `state` on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Clinic REST API listening on {}", addr);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed")?;
    info!("Clinic REST API stopped");
    Ok(())
}

/// Opens storage per `config` and runs the server until `shutdown_rx` fires
/// or the process receives Ctrl-C. Pending storage writes are flushed on the
/// way out.
pub async fn start_server(config: AppConfig, shutdown_rx: oneshot::Receiver<()>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::open(config)
        .await
        .context("Failed to open clinic storage")?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    let store = state.db.store().clone();
    let shutdown = async move {
        tokio::select! {
            _ = shutdown_rx => info!("Received external shutdown signal."),
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down."),
        }
    };
    serve(listener, state, shutdown).await?;
    store.flush().await.context("Failed to flush storage")?;
    Ok(())
}
