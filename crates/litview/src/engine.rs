/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The entry point for compiling and rendering templates.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::compiler::{CompiledTemplate, parse_param_list};
use crate::config::EngineConfig;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::{FileSystemLoader, SourceLoader};
use crate::locals::is_identifier;
use crate::renderer::{RenderOptions, Renderer, Source};
use crate::views::{ViewEngine, ViewOptions};

/// Compiles and renders templates.
///
/// An engine holds no per-render state; clones share the loader and every
/// call is independent.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    loader: Arc<dyn SourceLoader>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            loader: Arc::new(FileSystemLoader::new()),
        }
    }
}

impl Engine {
    /// Create an engine that reads templates from the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error if `config.default_key` is not a valid
    /// identifier.
    pub fn new(config: EngineConfig) -> TemplateResult<Self> {
        if !is_identifier(&config.default_key) {
            return Err(TemplateError::eval(format!(
                "'{}' is not a valid default key",
                config.default_key
            )));
        }
        let loader = match &config.root {
            Some(root) => FileSystemLoader::with_root(root),
            None => FileSystemLoader::new(),
        };
        Ok(Self {
            config,
            loader: Arc::new(loader),
        })
    }

    /// Read templates and partials through `loader` instead of the
    /// filesystem.
    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile template text against a comma-separated parameter list.
    ///
    /// An empty list compiles in default-key mode: the template takes one
    /// argument, bound to the configured default key (`$` unless changed),
    /// and [`CompiledTemplate::call_with`] passes all locals as its
    /// properties.
    ///
    /// ```
    /// use litview::{Engine, Value};
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile("${engineName} - fastest!", "engineName")?;
    /// assert_eq!(template.call(&[Value::from("jessica")])?, "jessica - fastest!");
    /// # Ok::<(), litview::TemplateError>(())
    /// ```
    pub fn compile(&self, text: &str, params: &str) -> TemplateResult<CompiledTemplate> {
        let names = parse_param_list(params);
        if names.is_empty() {
            return CompiledTemplate::compile_default_key(text, &self.config.default_key);
        }
        CompiledTemplate::compile(text, &names)
    }

    /// Render a template.
    ///
    /// `source` is template text when `options.template` is set, otherwise a
    /// path to read it from.
    pub async fn render(&self, source: &str, options: RenderOptions) -> TemplateResult<String> {
        let source = if options.template {
            Source::Inline(source.to_string())
        } else {
            Source::Path(source.into())
        };
        self.renderer().render(source, options).await
    }

    /// Render the template stored at `path`.
    ///
    /// `options.template` is ignored; use [`Engine::render_str`] for
    /// template text.
    pub async fn render_file(
        &self,
        path: impl AsRef<Path>,
        options: RenderOptions,
    ) -> TemplateResult<String> {
        let source = Source::Path(path.as_ref().to_path_buf());
        self.renderer().render(source, options).await
    }

    /// Render template text directly. Partials are still read through the
    /// loader.
    pub async fn render_str(&self, text: &str, options: RenderOptions) -> TemplateResult<String> {
        self.renderer()
            .render(Source::Inline(text.to_string()), options)
            .await
    }

    /// Read the template at `path` and compile it against `params`, for
    /// calling it repeatedly without reading it again.
    pub async fn precompile_file(
        &self,
        path: impl AsRef<Path>,
        params: &str,
    ) -> TemplateResult<CompiledTemplate> {
        let text = self.loader.load(path.as_ref()).await?;
        self.compile(&text, params)
    }

    fn renderer(&self) -> Renderer<'_> {
        Renderer::new(self.loader.as_ref())
    }
}

#[async_trait]
impl ViewEngine for Engine {
    async fn render_view(&self, path: &Path, options: ViewOptions) -> TemplateResult<String> {
        self.render_file(path, options.into()).await
    }
}
