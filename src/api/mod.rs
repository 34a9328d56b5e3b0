//! Read API
//!
//! A small HTTP surface over the news store:
//! - `GET /news/{limit}` returns the most recent items as JSON
//! - An optional static front-end served at `/`
//!
//! The router is built separately from the server so tests can drive it
//! with `tower::ServiceExt::oneshot` without opening sockets.

mod handlers;

pub use handlers::NewsItem;

use crate::storage::SharedStorage;
use crate::Result;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use tokio::sync::watch;
use tower_http::services::ServeDir;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub storage: SharedStorage,
}

/// Builds the API router
///
/// # Arguments
///
/// * `storage` - Store the handlers read from
/// * `webapp_dir` - Directory served at `/` when present
pub fn router(storage: SharedStorage, webapp_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/news/{limit}", get(handlers::latest_news))
        .route("/news/", get(handlers::missing_limit))
        .route("/news", get(handlers::missing_limit))
        .with_state(ApiState { storage });

    match webapp_dir {
        Some(dir) if dir.is_dir() => {
            tracing::info!("Serving web app from {}", dir.display());
            api.fallback_service(ServeDir::new(dir))
        }
        Some(dir) => {
            tracing::warn!(
                "Web app directory {} does not exist, serving the API only",
                dir.display()
            );
            api
        }
        None => api,
    }
}

/// Serves the router until `cancel` turns true
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Read API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = cancel.wait_for(|&cancelled| cancelled).await;
            tracing::info!("Read API shutting down");
        })
        .await?;

    Ok(())
}
