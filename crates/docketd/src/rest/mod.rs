// rest/mod.rs — Public REST API server.
//
// Axum HTTP server exposing the task store.
//
// Endpoints:
//   POST   /tasks
//   GET    /tasks
//   GET    /tasks/{id}
//   PUT    /tasks/{id}
//   DELETE /tasks/{id}
//   GET    /health

pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use color_eyre::Result;
use docket_core::tasks::TaskRepository;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handler state: the repository behind the whole API.
pub type Repo = Arc<dyn TaskRepository>;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

pub async fn serve(bind: &str, repo: Repo) -> Result<()> {
    let addr: SocketAddr = bind.parse()?;
    let router = build_router(repo);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(repo: Repo) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/tasks",
            get(routes::list_tasks)
                .post(routes::create_task)
                .fallback(error::method_not_allowed),
        )
        .route(
            "/tasks/{id}",
            get(routes::get_task)
                .put(routes::update_task)
                .delete(routes::delete_task)
                .fallback(error::method_not_allowed),
        )
        .fallback(error::unknown_path)
        .layer(CorsLayer::permissive())
        .with_state(repo)
}
