/*
 * renderer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The asynchronous render pipeline.
//!
//! A render loads the main template and all partials concurrently, renders
//! the partials into the locals, compiles the main template against the
//! local names and calls it with their values. The first failure ends the
//! render.

use std::path::PathBuf;

use crate::compiler::CompiledTemplate;
use crate::error::TemplateResult;
use crate::loader::SourceLoader;
use crate::locals::{Bindings, Locals};
use crate::partials::{Partials, apply_partials, load_partials};
use crate::value::Value;

/// Where the main template text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Template text given directly.
    Inline(String),
    /// Template text read through the loader.
    Path(PathBuf),
}

/// Options for a single render.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Values bound to template parameters by name.
    pub locals: Locals,
    /// Partials rendered into the locals before the main template.
    pub partials: Partials,
    /// Make [`Engine::render`](crate::Engine::render) treat its source
    /// argument as template text instead of a path. A [`Renderer`] always
    /// follows the [`Source`] it is given.
    pub template: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a local.
    pub fn local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name, value);
        self
    }

    /// Replace all locals.
    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    /// Register a partial.
    pub fn partial(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.partials.insert(name, path);
        self
    }

    /// Replace all partials.
    pub fn partials(mut self, partials: Partials) -> Self {
        self.partials = partials;
        self
    }

    /// Mark the source as inline template text.
    pub fn template(mut self, template: bool) -> Self {
        self.template = template;
        self
    }
}

/// Runs renders against a loader.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    loader: &'a dyn SourceLoader,
}

impl<'a> Renderer<'a> {
    pub fn new(loader: &'a dyn SourceLoader) -> Self {
        Self { loader }
    }

    /// Render `source` with `options`.
    ///
    /// # Errors
    ///
    /// Returns the first error from loading the template or a partial,
    /// compiling, or evaluating.
    pub async fn render(&self, source: Source, options: RenderOptions) -> TemplateResult<String> {
        let RenderOptions { locals, partials, .. } = options;

        let main = async {
            match source {
                Source::Path(path) => self.loader.load(&path).await,
                Source::Inline(text) => Ok(text),
            }
        };
        let (text, loaded) = futures::try_join!(main, load_partials(self.loader, &partials))?;

        let locals = apply_partials(loaded, locals)?;
        let (names, values) = Bindings::from_locals(locals).into_parts();
        CompiledTemplate::compile(&text, &names)?.call(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use pretty_assertions::assert_eq;

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with("index.html", "<h1>${title}</h1>${main}")
            .with("main.html", "<p>hi</p>")
    }

    #[tokio::test]
    async fn test_render_path_with_partial() {
        let loader = loader();
        let options = RenderOptions::new()
            .local("title", "Welcome!")
            .partial("main", "main.html");

        let out = Renderer::new(&loader)
            .render(Source::Path("index.html".into()), options)
            .await
            .unwrap();
        assert_eq!(out, "<h1>Welcome!</h1><p>hi</p>");
    }

    #[tokio::test]
    async fn test_render_inline() {
        let loader = loader();
        let out = Renderer::new(&loader)
            .render(
                Source::Inline("${title}".to_string()),
                RenderOptions::new().local("title", "Welcome!"),
            )
            .await
            .unwrap();
        assert_eq!(out, "Welcome!");
    }

    #[tokio::test]
    async fn test_path_source_is_loaded_even_with_template_flag() {
        let loader = loader();
        let out = Renderer::new(&loader)
            .render(
                Source::Path("main.html".into()),
                RenderOptions::new().template(true),
            )
            .await
            .unwrap();
        assert_eq!(out, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_missing_template() {
        let loader = loader();
        let err = Renderer::new(&loader)
            .render(Source::Path("nope.html".into()), RenderOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_file_read());
    }

    #[tokio::test]
    async fn test_missing_local_is_evaluation_error() {
        let loader = loader();
        let err = Renderer::new(&loader)
            .render(
                Source::Path("index.html".into()),
                RenderOptions::new().local("title", "T"),
            )
            .await
            .unwrap_err();
        assert!(err.is_evaluation());
    }
}
