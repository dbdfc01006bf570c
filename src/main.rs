//! Response Finalizer demo server
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌────────────────────────────────────────────────────┐
//!     ────────────────────┼─▶ request id ─▶ trace ─▶ timeout ─▶ finalize ──┐    │
//!                         │                                               ▼    │
//!                         │                                        route handler│
//!                         │                                   (ResponseIntent) │
//!                         │                                               │    │
//!     Client Response     │   304 │ 302 │ JSON │ page          ◀──────────┘    │
//!     ◀───────────────────┼───────────────────────────────────────────────────│
//!                         │  templates (Handlebars, hot reload)  permissions   │
//!                         └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::{extract::Path, routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;

use response_finalizer::config::{load_config, FinalizerConfig};
use response_finalizer::http::{shutdown_signal, HandlerResult, HttpServer};
use response_finalizer::observability::{logging, metrics};
use response_finalizer::{HandlerError, Payload, ResponseIntent};

#[derive(Parser)]
#[command(name = "response-finalizer")]
#[command(about = "Demo server for the HTTP response finalizer", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FinalizerConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("response-finalizer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        templates = %config.templates.directory.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::from_config(config, demo_routes())?;
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_routes() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/status", get(status))
        .route("/d/{domain_id}/welcome", get(welcome))
        .route("/legacy", get(legacy))
        .route("/report.csv", get(report))
        .route("/problem/{id}", get(problem))
}

async fn home() -> HandlerResult {
    Ok(ResponseIntent::page(
        "home.html",
        Payload::map().with("title", "Response Finalizer"),
    ))
}

async fn status() -> HandlerResult {
    Ok(ResponseIntent::data(
        Payload::map()
            .with("version", env!("CARGO_PKG_VERSION"))
            .with("status", "operational"),
    )
    .with_cache_tag(concat!("\"", env!("CARGO_PKG_VERSION"), "\"")))
}

async fn welcome(Path(domain_id): Path<String>) -> HandlerResult {
    Ok(ResponseIntent::page(
        "welcome.html",
        Payload::map().with("domain", domain_id),
    ))
}

async fn legacy() -> HandlerResult {
    Ok(ResponseIntent::redirect_to("/"))
}

async fn report() -> HandlerResult {
    Ok(ResponseIntent::data("id,score\n1,100\n2,85\n")
        .with_content_type("text/csv")
        .with_disposition("attachment; filename=\"report.csv\""))
}

async fn problem(Path(id): Path<u32>) -> HandlerResult {
    if id == 1 {
        return Ok(ResponseIntent::page(
            "home.html",
            Payload::map().with("title", "A + B Problem"),
        ));
    }
    Err(HandlerError::not_found(format!("Problem {id} not found")))
}
