/*
 * views.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! View engines and the view registry used by web frameworks.
//!
//! A web framework renders a view by name. [`Views`] turns the name into a
//! path under its views directory, picks the [`ViewEngine`] registered for
//! the file extension, and hands the render over to it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{TemplateError, TemplateResult};
use crate::locals::Locals;
use crate::partials::Partials;
use crate::renderer::RenderOptions;
use crate::value::Value;

/// Options a web framework passes when rendering a view.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub locals: Locals,
    pub partials: Partials,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name, value);
        self
    }

    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    pub fn partial(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.partials.insert(name, path);
        self
    }
}

impl From<ViewOptions> for RenderOptions {
    fn from(options: ViewOptions) -> Self {
        RenderOptions {
            locals: options.locals,
            partials: options.partials,
            template: false,
        }
    }
}

/// Something that renders a view file.
#[async_trait]
pub trait ViewEngine: Send + Sync {
    /// Render the view at `path`.
    async fn render_view(&self, path: &Path, options: ViewOptions) -> TemplateResult<String>;
}

/// Registry of view engines by file extension.
#[derive(Clone)]
pub struct Views {
    dir: PathBuf,
    default_extension: Option<String>,
    engines: HashMap<String, Arc<dyn ViewEngine>>,
}

impl fmt::Debug for Views {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<_> = self.engines.keys().collect();
        extensions.sort();
        f.debug_struct("Views")
            .field("dir", &self.dir)
            .field("default_extension", &self.default_extension)
            .field("engines", &extensions)
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}

impl Views {
    /// Create a registry for views stored under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            default_extension: None,
            engines: HashMap::new(),
        }
    }

    /// Extension appended to view names that have none, e.g. `"html"`.
    pub fn with_default_extension(mut self, extension: &str) -> Self {
        self.default_extension = Some(normalize_extension(extension));
        self
    }

    /// Register `engine` for files ending in `extension`.
    pub fn register(&mut self, extension: &str, engine: impl ViewEngine + 'static) -> &mut Self {
        self.engines
            .insert(normalize_extension(extension), Arc::new(engine));
        self
    }

    /// Builder form of [`Views::register`].
    pub fn with_engine(mut self, extension: &str, engine: impl ViewEngine + 'static) -> Self {
        self.register(extension, engine);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file a view name refers to.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let mut path = self.dir.join(name);
        if path.extension().is_none() {
            if let Some(extension) = &self.default_extension {
                let mut file = path.into_os_string();
                file.push(".");
                file.push(extension);
                path = PathBuf::from(file);
            }
        }
        path
    }

    /// Render the view called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NoViewEngine`] when no engine is registered
    /// for the view's extension, or whatever the engine fails with.
    pub async fn render(&self, name: &str, options: ViewOptions) -> TemplateResult<String> {
        let path = self.resolve(name);
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let engine = self
            .engines
            .get(&extension)
            .ok_or_else(|| TemplateError::NoViewEngine {
                extension: extension.clone(),
            })?;

        engine.render_view(&path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::loader::MemoryLoader;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Shout;

    #[async_trait]
    impl ViewEngine for Shout {
        async fn render_view(&self, path: &Path, _options: ViewOptions) -> TemplateResult<String> {
            Ok(path.display().to_string().to_uppercase())
        }
    }

    #[test]
    fn test_resolve_appends_default_extension() {
        let views = Views::new("views").with_default_extension(".html");
        assert_eq!(views.resolve("index"), PathBuf::from("views/index.html"));
        assert_eq!(views.resolve("feed.xml"), PathBuf::from("views/feed.xml"));
        assert_eq!(views.resolve("/abs/page"), PathBuf::from("/abs/page.html"));
    }

    #[tokio::test]
    async fn test_dispatch_by_extension() {
        let views = Views::new("v")
            .with_default_extension("html")
            .with_engine("txt", Shout)
            .with_engine(
                "html",
                Engine::default().with_loader(MemoryLoader::new().with("v/index.html", "<i>${n}</i>")),
            );

        let html = views
            .render("index", ViewOptions::new().local("n", 2))
            .await
            .unwrap();
        assert_eq!(html, "<i>2</i>");

        let text = views.render("note.txt", ViewOptions::new()).await.unwrap();
        assert_eq!(text, "V/NOTE.TXT");
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let views = Views::new("v").with_engine("html", Shout);
        let err = views.render("page.md", ViewOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            TemplateError::NoViewEngine { ref extension } if extension == "md"
        ));
    }

    #[test]
    fn test_view_options_into_render_options() {
        let options: RenderOptions = ViewOptions::new()
            .local("a", 1)
            .partial("main", "main.html")
            .into();
        assert!(!options.template);
        assert_eq!(options.locals.len(), 1);
        assert_eq!(options.partials.len(), 1);
    }
}
