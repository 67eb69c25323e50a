/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template source loading.
//!
//! This module provides the [`SourceLoader`] trait for reading template and
//! partial text, with implementations for the filesystem and for in-memory
//! sources.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{TemplateError, TemplateResult};

/// Trait for loading template sources.
///
/// Loading only suspends the render that requested it.
#[async_trait]
pub trait SourceLoader: Send + Sync + Debug {
    /// Load the text at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::FileRead`] if the source cannot be read.
    async fn load(&self, path: &Path) -> TemplateResult<String>;
}

/// Loader that reads sources from the filesystem.
///
/// Relative paths are resolved against `root` when one is set, otherwise
/// against the process working directory. Absolute paths are used as-is.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    root: Option<PathBuf>,
}

impl FileSystemLoader {
    /// Create a loader that resolves relative paths against the working
    /// directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The path that will actually be read for `path`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl SourceLoader for FileSystemLoader {
    async fn load(&self, path: &Path) -> TemplateResult<String> {
        let resolved = self.resolve(path);
        let text = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|source| TemplateError::FileRead {
                path: resolved.clone(),
                source,
            })?;
        tracing::debug!(path = %resolved.display(), bytes = text.len(), "loaded template source");
        Ok(text)
    }
}

/// Loader that serves sources from an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source under `path`.
    pub fn add(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> &mut Self {
        self.sources.insert(path.into(), text.into());
        self
    }

    /// Builder form of [`MemoryLoader::add`].
    pub fn with(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.add(path, text);
        self
    }
}

#[async_trait]
impl SourceLoader for MemoryLoader {
    async fn load(&self, path: &Path) -> TemplateResult<String> {
        match self.sources.get(path) {
            Some(text) => {
                tracing::debug!(path = %path.display(), bytes = text.len(), "loaded template source");
                Ok(text.clone())
            }
            None => Err(TemplateError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such template"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let loader = FileSystemLoader::with_root("/srv/views");
        assert_eq!(
            loader.resolve(Path::new("index.html")),
            PathBuf::from("/srv/views/index.html")
        );
        assert_eq!(
            loader.resolve(Path::new("/tmp/other.html")),
            PathBuf::from("/tmp/other.html")
        );
        assert_eq!(
            FileSystemLoader::new().resolve(Path::new("index.html")),
            PathBuf::from("index.html")
        );
    }

    #[tokio::test]
    async fn test_filesystem_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<h1>${title}</h1>").unwrap();

        let loader = FileSystemLoader::with_root(dir.path());
        let text = loader.load(Path::new("page.html")).await.unwrap();
        assert_eq!(text, "<h1>${title}</h1>");
    }

    #[tokio::test]
    async fn test_filesystem_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileSystemLoader::with_root(dir.path());

        let err = loader.load(Path::new("missing.html")).await.unwrap_err();
        match err {
            TemplateError::FileRead { path, source } => {
                assert_eq!(path, dir.path().join("missing.html"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_memory_loader() {
        let loader = MemoryLoader::new().with("main.html", "<p>hi</p>");
        assert_eq!(loader.load(Path::new("main.html")).await.unwrap(), "<p>hi</p>");
        assert!(loader.load(Path::new("other.html")).await.unwrap_err().is_file_read());
    }
}
