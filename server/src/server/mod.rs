//! HTTP API for building kustomizations and browsing examples

pub mod build;
pub mod samples;

use std::sync::Arc;

use axum::response::Html;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppContext;

/// Create the application router around an already-built context.
pub fn create_app(context: AppContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate", post(build::generate))
        .route("/validate", post(build::validate))
        .route("/samples", get(samples::list_samples))
        .route("/samples/:filename", get(samples::get_sample))
        .layer(Extension(Arc::new(context)))
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// Health check handler
async fn health_check() -> &'static str {
    "OK"
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(host: &str, port: u16, context: AppContext) -> anyhow::Result<()> {
    let app = create_app(context);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Kustomize builder listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
