//! HTTP service for SsamNote note refinement.
//!
//! `ssamnote-web` exposes [`RefinementService`] as `POST /api/transform`,
//! plus a few read-only endpoints a front end needs to render the note
//! editor. It can also serve a static front-end export.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use ssamnote::prelude::*;
//! use ssamnote_web::{WebConfig, spawn_web};
//!
//! let config = RefineConfig::from_env();
//! let generator = OpenRouterGenerator::new(&config)?;
//! let service = Arc::new(RefinementService::new(Arc::new(generator), config));
//!
//! let addr = spawn_web(service, WebConfig::default()).await?;
//! println!("Listening on http://{addr}");
//! ```
//!
//! # Endpoints
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/transform` | Refine one note: `{rawContent, studentNames?, domainTags?}` |
//! | `GET /api/health` | `{"status":"ok","configured":bool}` |
//! | `GET /api/domain-tags` | The five-area domain taxonomy |
//! | `GET /api/time-blocks` | The default daily schedule |
//!
//! Failed transforms answer with `{"error": <message>, "code": <code>}`;
//! messages are fixed and never carry provider detail.

mod api;
mod server;

pub use api::ApiError;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ssamnote::refine::RefinementService;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory of a static front-end export.
    ///
    /// If `None`, only the API is served.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(
    service: Arc<RefinementService>,
    config: WebConfig,
) -> std::io::Result<SocketAddr> {
    let router = server::build_router(service, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
