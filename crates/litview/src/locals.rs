/*
 * locals.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Named values supplied to a render, and their positional binding.
//!
//! A compiled template receives its arguments positionally, so the order of
//! names must not change between building the [`Bindings`] and calling the
//! template. [`Locals`] therefore keeps insertion order and replaces values
//! in place when a name is inserted twice.

use serde::Serialize;

use crate::error::{TemplateError, TemplateResult};
use crate::value::Value;

/// Words that cannot be used as parameter names because the expression
/// grammar gives them a meaning of its own.
pub const RESERVED_WORDS: &[&str] = &["true", "false", "null", "undefined", "typeof"];

/// Check whether `name` can be bound as a template parameter.
///
/// Valid names start with a letter, `_` or `$`, continue with letters,
/// digits, `_` or `$`, and are not one of [`RESERVED_WORDS`].
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') && !RESERVED_WORDS.contains(&name)
}

/// Insertion-ordered map of local names to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals {
    entries: Vec<(String, Value)>,
}

impl Locals {
    /// Create an empty set of locals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build locals from any type that serializes to a map.
    ///
    /// Struct fields become local names in declaration order.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> TemplateResult<Self> {
        let json = serde_json::to_value(value)
            .map_err(|e| TemplateError::eval(format!("Cannot convert locals: {}", e)))?;
        Self::from_json(json)
    }

    /// Build locals from a JSON object.
    pub fn from_json(value: serde_json::Value) -> TemplateResult<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect()),
            other => Err(TemplateError::eval(format!(
                "locals must be an object, got {}",
                Value::from(other).type_name()
            ))),
        }
    }

    /// Insert a local, replacing the value of an existing name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builder form of [`Locals::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a local by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of locals.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no locals.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Collect every local into one object value, keyed by local name.
    pub fn into_object(self) -> Value {
        Value::Object(self.entries.into_iter().collect())
    }

    /// Merge another set of locals into this one. Later values win.
    pub fn extend(&mut self, other: Locals) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Locals {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut locals = Locals::new();
        for (name, value) in iter {
            locals.insert(name, value);
        }
        locals
    }
}

/// Parameter names paired with the values passed for them, by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl Bindings {
    /// Bind every local under its own name.
    pub fn from_locals(locals: Locals) -> Self {
        let (names, values) = locals.entries.into_iter().unzip();
        Self { names, values }
    }

    /// Bind a single value under the default key, e.g. `$`.
    ///
    /// Templates then reach into the value with property access:
    /// `${$.title}`.
    pub fn default_key(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            names: vec![key.into()],
            values: vec![value.into()],
        }
    }

    /// Split into the name list and the positional values.
    pub fn into_parts(self) -> (Vec<String>, Vec<Value>) {
        (self.names, self.values)
    }
}
