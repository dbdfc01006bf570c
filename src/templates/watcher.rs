//! Template directory watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::engine::HandlebarsTemplates;

/// Reloads templates when files in their directory change.
pub struct TemplateWatcher {
    directory: PathBuf,
    templates: Arc<HandlebarsTemplates>,
}

impl TemplateWatcher {
    /// Returns `None` when the templates were not loaded from a directory.
    pub fn new(templates: Arc<HandlebarsTemplates>) -> Option<Self> {
        let directory = templates.source()?.directory.clone();
        Some(Self { directory, templates })
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let templates = self.templates.clone();

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        match templates.reload() {
                            Ok(count) => tracing::info!(templates = count, "Templates reloaded"),
                            Err(e) => {
                                tracing::error!("Failed to reload templates: {}. Keeping current set.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        watcher.watch(&self.directory, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.directory, "Template watcher started");
        Ok(watcher)
    }
}
