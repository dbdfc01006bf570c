//! Handlebars-backed template engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use handlebars::Handlebars;

use super::{RenderError, TemplateRegistry, TemplateRenderer};
use crate::finalizer::Payload;

/// Where templates are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub directory: PathBuf,
    /// File extension stripped from template names, e.g. `.hbs`.
    pub extension: String,
}

/// Error type for template loading.
#[derive(Debug, thiserror::Error)]
pub enum TemplateLoadError {
    #[error("failed to read template directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("templates were not loaded from a directory")]
    NoSource,
}

/// Template registry that can be swapped atomically.
pub struct HandlebarsTemplates {
    registry: ArcSwap<Handlebars<'static>>,
    source: Option<TemplateSource>,
    strict: bool,
}

impl HandlebarsTemplates {
    /// Build from in-memory `(name, source)` pairs.
    pub fn from_sources<I, N, S>(templates: I) -> Result<Self, TemplateLoadError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut registry = new_registry(false);
        for (name, source) in templates {
            register(&mut registry, name.into(), source.as_ref())?;
        }
        Ok(Self {
            registry: ArcSwap::from_pointee(registry),
            source: None,
            strict: false,
        })
    }

    /// Load every matching file under the source directory.
    pub fn load(source: TemplateSource, strict: bool) -> Result<Self, TemplateLoadError> {
        let registry = load_registry(&source, strict)?;
        tracing::info!(
            directory = %source.directory.display(),
            templates = registry.get_templates().len(),
            "Templates loaded"
        );
        Ok(Self {
            registry: ArcSwap::from_pointee(registry),
            source: Some(source),
            strict,
        })
    }

    /// Reload from the source directory. On failure the current registry stays.
    pub fn reload(&self) -> Result<usize, TemplateLoadError> {
        let source = self.source.as_ref().ok_or(TemplateLoadError::NoSource)?;
        let registry = load_registry(source, self.strict)?;
        let count = registry.get_templates().len();
        self.registry.store(Arc::new(registry));
        Ok(count)
    }

    pub fn source(&self) -> Option<&TemplateSource> {
        self.source.as_ref()
    }

    pub fn len(&self) -> usize {
        self.registry.load().get_templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TemplateRenderer for HandlebarsTemplates {
    async fn render(&self, name: &str, data: &Payload) -> Result<String, RenderError> {
        let registry = self.registry.load_full();
        if !registry.has_template(name) {
            return Err(RenderError::NotFound(name.to_string()));
        }
        registry.render(name, data).map_err(|e| RenderError::Engine {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

impl TemplateRegistry for HandlebarsTemplates {
    fn template_exists(&self, name: &str) -> bool {
        self.registry.load().has_template(name)
    }
}

fn new_registry(strict: bool) -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(strict);
    registry
}

fn register(registry: &mut Handlebars<'static>, name: String, source: &str) -> Result<(), TemplateLoadError> {
    registry
        .register_template_string(&name, source)
        .map_err(|e| TemplateLoadError::Template {
            name,
            source: Box::new(e),
        })
}

fn load_registry(source: &TemplateSource, strict: bool) -> Result<Handlebars<'static>, TemplateLoadError> {
    let mut files = Vec::new();
    collect_files(&source.directory, &mut files).map_err(|e| TemplateLoadError::Io {
        path: source.directory.clone(),
        source: e,
    })?;

    let mut registry = new_registry(strict);
    for path in files {
        let Some(name) = template_name(&source.directory, &path, &source.extension) else {
            continue;
        };
        let content = fs::read_to_string(&path).map_err(|e| TemplateLoadError::Io {
            path: path.clone(),
            source: e,
        })?;
        register(&mut registry, name, &content)?;
    }
    Ok(registry)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// `root/admin/user.html.hbs` → `admin/user.html`.
fn template_name(root: &Path, path: &Path, extension: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let hidden = relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
    if hidden {
        return None;
    }
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    relative
        .strip_suffix(extension)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_render_from_sources() {
        let templates = HandlebarsTemplates::from_sources([("hello.html", "<p>{{name}}</p>")]).unwrap();
        let out = templates
            .render("hello.html", &Payload::map().with("name", "<b>x</b>"))
            .await
            .unwrap();
        assert_eq!(out, "<p>&lt;b&gt;x&lt;/b&gt;</p>");
        assert!(templates.template_exists("hello.html"));
        assert!(!templates.template_exists("hello.d1.html"));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let templates = HandlebarsTemplates::from_sources(Vec::<(String, String)>::new()).unwrap();
        let err = templates.render("nope.html", &Payload::map()).await.unwrap_err();
        assert_eq!(err, RenderError::NotFound("nope.html".into()));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = HandlebarsTemplates::from_sources([("bad.html", "{{#if}}")]);
        assert!(matches!(result, Err(TemplateLoadError::Template { .. })));
    }

    #[test]
    fn test_load_directory_and_reload() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::create_dir_all(dir.join("admin")).unwrap();
        fs::write(dir.join("home.html.hbs"), "home").unwrap();
        fs::write(dir.join("admin").join("users.html.hbs"), "users").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        fs::write(dir.join(".draft.html.hbs"), "hidden").unwrap();

        let source = TemplateSource {
            directory: dir.to_path_buf(),
            extension: ".hbs".into(),
        };
        let templates = HandlebarsTemplates::load(source, false).unwrap();
        assert_eq!(templates.len(), 2);
        assert!(templates.template_exists("home.html"));
        assert!(templates.template_exists("admin/users.html"));

        fs::write(dir.join("home.d1.html.hbs"), "home for d1").unwrap();
        assert_eq!(templates.reload().unwrap(), 3);
        assert!(templates.template_exists("home.d1.html"));
    }

    #[test]
    fn test_reload_without_source() {
        let templates = HandlebarsTemplates::from_sources([("a.html", "a")]).unwrap();
        assert!(matches!(templates.reload(), Err(TemplateLoadError::NoSource)));
    }
}
