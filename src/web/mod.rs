//! Web UI and JSON API for driving the feedback loop from a browser.

pub mod handlers;
pub mod types;

use crate::app::ServicesProvider;
use crate::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared, read-only server state; every run builds its own collaborators.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ServicesProvider>,
    pub max_iterations: u32,
}

impl AppState {
    pub fn new(provider: Arc<dyn ServicesProvider>, max_iterations: u32) -> Self {
        Self {
            provider,
            max_iterations,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/runs", post(handlers::create_run))
        .route("/runs/stream", post(handlers::stream_run))
        .with_state(state.clone());

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .with_state(state)
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Feedback loop UI listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
