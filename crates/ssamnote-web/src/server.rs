//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ssamnote::refine::RefinementService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::api::{self, AppState};

/// Build the full axum router.
///
/// The router serves:
/// - REST API at `/api/*`
/// - Optional static files for a front-end export
pub fn build_router(service: Arc<RefinementService>, static_dir: Option<PathBuf>) -> Router {
    let app_state = AppState { service };

    // CORS layer for development (front-end dev server on a different port).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/transform", post(api::post_transform))
        .route("/api/health", get(api::get_health))
        .route("/api/domain-tags", get(api::get_domain_tags))
        .route("/api/time-blocks", get(api::get_time_blocks))
        .with_state(app_state)
        .layer(cors);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
}

/// Bind, spawn the server, and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("Serving on http://{addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Server stopped: {e}");
        }
    });

    Ok(addr)
}
