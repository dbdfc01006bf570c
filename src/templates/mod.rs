//! Template subsystem.
//!
//! # Data Flow
//! ```text
//! template directory (*.hbs)
//!     → engine.rs (load into a Handlebars registry)
//!     → ArcSwap<Handlebars> (shared, read-mostly)
//!     → finalizer asks: template_exists(name)? render(name, data)
//!
//! On change (when watching):
//!     watcher.rs detects change
//!     → engine.rs builds a fresh registry
//!     → atomic swap; in-flight renders keep the old one
//! ```
//!
//! # Design Decisions
//! - The finalizer sees two narrow capabilities, not the engine
//! - Template names are file paths relative to the directory, minus the extension

pub mod engine;
pub mod watcher;

use async_trait::async_trait;

use crate::finalizer::Payload;

pub use engine::{HandlebarsTemplates, TemplateLoadError, TemplateSource};
pub use watcher::TemplateWatcher;

/// Failure while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to render template {name}: {message}")]
    Engine { name: String, message: String },
}

/// Renders a named template with payload data.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(&self, name: &str, data: &Payload) -> Result<String, RenderError>;
}

/// Answers whether a template name is registered.
pub trait TemplateRegistry: Send + Sync {
    fn template_exists(&self, name: &str) -> bool;
}
