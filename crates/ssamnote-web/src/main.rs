//! SsamNote refinement service.
//!
//! Serves `POST /api/transform` backed by OpenRouter. Reads the API key from
//! `OPENROUTER_KEY`; without it the service still starts and answers every
//! transform with a configuration error.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run -p ssamnote-web
//! OPENROUTER_KEY=sk-... cargo run -p ssamnote-web -- --model google/gemini-2.5-flash
//! OPENROUTER_KEY=sk-... cargo run -p ssamnote-web -- --port 8080 --static-dir out
//! ```
//!
//! ```bash
//! curl -s localhost:3001/api/transform \
//!   -H 'content-type: application/json' \
//!   -d '{"rawContent":"철수가 블록으로 탑을 쌓았다","studentNames":["철수"]}'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ssamnote::prelude::*;
use ssamnote_web::{WebConfig, spawn_web};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Note-refinement HTTP service.
#[derive(Parser)]
#[command(about = "Serve the SsamNote note-refinement API")]
struct Args {
    /// LLM model to use (overrides SSAMNOTE_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Directory of a static front-end export to serve.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = RefineConfig::from_env();
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    if !config.is_configured() {
        warn!("OPENROUTER_KEY is not set; transforms will fail with a configuration error");
    }
    info!("Using model {}", config.model);

    let generator = OpenRouterGenerator::new(&config).map_err(|e| e.to_string())?;
    let service = Arc::new(RefinementService::new(Arc::new(generator), config));

    let web_config = WebConfig {
        bind_addr: ([127, 0, 0, 1], args.port).into(),
        static_dir: args.static_dir,
    };
    let addr = spawn_web(service, web_config)
        .await
        .map_err(|e| format!("failed to start server: {e}"))?;
    println!("SsamNote API: http://{addr}/api/transform");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}
