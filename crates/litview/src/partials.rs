/*
 * partials.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partial resolution.
//!
//! A partial is a sub-template whose rendered text is bound to a local
//! name of the template that includes it. Partials are rendered with the
//! parent's locals only, so they resolve exactly one level deep: a partial
//! cannot reference another partial.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;

use crate::compiler::CompiledTemplate;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::SourceLoader;
use crate::locals::{Bindings, Locals};

/// Insertion-ordered map of placeholder names to partial paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partials {
    entries: Vec<(String, PathBuf)>,
}

impl Partials {
    /// Create an empty partial map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a partial, replacing the path of an existing name.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        let name = name.into();
        let path = path.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = path,
            None => self.entries.push((name, path)),
        }
        self
    }

    /// Builder form of [`Partials::insert`].
    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(name, path);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }
}

impl<K: Into<String>, P: Into<PathBuf>> FromIterator<(K, P)> for Partials {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        let mut partials = Partials::new();
        for (name, path) in iter {
            partials.insert(name, path);
        }
        partials
    }
}

/// A partial whose source has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPartial {
    pub name: String,
    pub source: String,
}

/// Load every partial concurrently.
///
/// Fails with the first load error; results keep the order of `partials`.
pub async fn load_partials(
    loader: &dyn SourceLoader,
    partials: &Partials,
) -> TemplateResult<Vec<LoadedPartial>> {
    try_join_all(partials.iter().map(|(name, path)| async move {
        let source = loader.load(path).await?;
        tracing::debug!(partial = name, path = %path.display(), "loaded partial");
        Ok::<_, TemplateError>(LoadedPartial {
            name: name.to_string(),
            source,
        })
    }))
    .await
}

/// Render loaded partials against the parent locals and bind each result
/// under its partial name.
///
/// Every partial sees the parent locals as they were before any partial was
/// applied.
pub fn apply_partials(loaded: Vec<LoadedPartial>, locals: Locals) -> TemplateResult<Locals> {
    if loaded.is_empty() {
        return Ok(locals);
    }

    let (names, values) = Bindings::from_locals(locals.clone()).into_parts();
    let mut rendered = Vec::with_capacity(loaded.len());
    for partial in loaded {
        let template = CompiledTemplate::compile(&partial.source, &names)?;
        rendered.push((partial.name, template.call(&values)?));
    }

    let mut merged = locals;
    merged.extend(rendered.into_iter().collect());
    Ok(merged)
}

/// Load and render all partials, returning the merged locals.
pub async fn resolve_partials(
    loader: &dyn SourceLoader,
    partials: &Partials,
    locals: Locals,
) -> TemplateResult<Locals> {
    let loaded = load_partials(loader, partials).await?;
    apply_partials(loaded, locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partials_insert_replaces() {
        let partials = Partials::new()
            .with("header", "header.html")
            .with("footer", "footer.html")
            .with("header", "alt-header.html");
        let entries: Vec<_> = partials.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("header", Path::new("alt-header.html")),
                ("footer", Path::new("footer.html")),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_binds_rendered_partial() {
        let loader = MemoryLoader::new().with("main.html", "<p>${greeting}</p>");
        let partials = Partials::new().with("main", "main.html");
        let locals = Locals::new().with("greeting", "hi");

        let merged = resolve_partials(&loader, &partials, locals).await.unwrap();
        assert_eq!(merged.get("main"), Some(&Value::from("<p>hi</p>")));
        assert_eq!(merged.get("greeting"), Some(&Value::from("hi")));
    }

    #[tokio::test]
    async fn test_partials_are_one_level_deep() {
        let loader = MemoryLoader::new()
            .with("outer.html", "<div>${inner}</div>")
            .with("inner.html", "<span>inner</span>");
        let partials = Partials::new()
            .with("outer", "outer.html")
            .with("inner", "inner.html");

        let err = resolve_partials(&loader, &partials, Locals::new())
            .await
            .unwrap_err();
        assert!(err.is_evaluation());
        assert_eq!(err.to_string(), "Evaluation error: inner is not defined");
    }

    #[tokio::test]
    async fn test_missing_partial_fails_render() {
        let loader = MemoryLoader::new().with("a.html", "a");
        let partials = Partials::new().with("a", "a.html").with("b", "b.html");

        let err = resolve_partials(&loader, &partials, Locals::new())
            .await
            .unwrap_err();
        assert!(err.is_file_read());
    }

    #[tokio::test]
    async fn test_partial_replaces_local_with_same_name() {
        let loader = MemoryLoader::new().with("main.html", "<p>${main}</p>");
        let partials = Partials::new().with("main", "main.html");
        let locals = Locals::new().with("main", "x").with("title", "T");

        let merged = resolve_partials(&loader, &partials, locals).await.unwrap();
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["main", "title"]);
        assert_eq!(merged.get("main"), Some(&Value::from("<p>x</p>")));
    }

    #[test]
    fn test_apply_without_partials_keeps_locals() {
        let locals = Locals::new().with("title", "T");
        assert_eq!(apply_partials(vec![], locals.clone()).unwrap(), locals);
    }
}
