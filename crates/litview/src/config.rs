/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Key under which a single value is bound when a template is compiled
/// without a parameter list.
pub const DEFAULT_KEY: &str = "$";

/// Configuration for an [`Engine`](crate::Engine).
///
/// Deserializable so it can be embedded in an application's own
/// configuration file:
///
/// ```toml
/// root = "views"
/// default-key = "$"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Directory that relative template paths are resolved against.
    /// Default: the process working directory.
    pub root: Option<PathBuf>,

    /// Name bound to the single argument of a template compiled with an
    /// empty parameter list.
    /// Default: `$`.
    pub default_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: None,
            default_key: DEFAULT_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative template paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Use `key` as the default binding key.
    pub fn with_default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }
}
