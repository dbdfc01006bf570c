//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Load templates and build the finalizer from config
//! - Wrap caller routes with the finalize middleware
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use notify::RecommendedWatcher;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::FinalizerConfig;
use crate::finalizer::Finalizer;
use crate::http::finalize::{finalize_response, FinalizeState};
use crate::templates::{HandlebarsTemplates, TemplateLoadError, TemplateWatcher};

/// Error type for server construction.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Templates(#[from] TemplateLoadError),

    #[error("failed to watch templates: {0}")]
    Watch(#[from] notify::Error),
}

/// HTTP server fronted by the response finalizer.
pub struct HttpServer {
    router: Router,
    config: FinalizerConfig,
    templates: Arc<HandlebarsTemplates>,
    _watcher: Option<RecommendedWatcher>,
}

impl HttpServer {
    /// Load templates from the configured directory and wrap `routes`.
    pub fn from_config(config: FinalizerConfig, routes: Router) -> Result<Self, ServerError> {
        let templates = Arc::new(HandlebarsTemplates::load(
            config.templates.source(),
            config.templates.strict,
        )?);

        let watcher = if config.templates.watch {
            TemplateWatcher::new(templates.clone())
                .map(TemplateWatcher::run)
                .transpose()?
        } else {
            None
        };

        Ok(Self::with_templates(config, routes, templates, watcher))
    }

    /// Wrap `routes` using already loaded templates.
    pub fn new(config: FinalizerConfig, routes: Router, templates: Arc<HandlebarsTemplates>) -> Self {
        Self::with_templates(config, routes, templates, None)
    }

    fn with_templates(
        config: FinalizerConfig,
        routes: Router,
        templates: Arc<HandlebarsTemplates>,
        watcher: Option<RecommendedWatcher>,
    ) -> Self {
        let finalizer = Finalizer::new(templates.clone()).with_error_pages(config.templates.error_pages());
        let router = Self::build_router(&config, routes, Arc::new(finalizer));
        Self {
            router,
            config,
            templates,
            _watcher: watcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &FinalizerConfig, routes: Router, finalizer: Arc<Finalizer>) -> Router {
        let state = FinalizeState {
            finalizer,
            negotiation: config.negotiation.clone(),
        };

        routes
            .layer(middleware::from_fn_with_state(state, finalize_response))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            templates = self.templates.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router with all layers applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The live template registry, e.g. for an explicit reload.
    pub fn templates(&self) -> Arc<HandlebarsTemplates> {
        self.templates.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FinalizerConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received");
}
