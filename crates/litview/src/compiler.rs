/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compilation.
//!
//! A [`CompiledTemplate`] is the parsed template together with the ordered
//! list of parameter names it was compiled against. Calling it binds values
//! to those names by position.

use std::sync::Arc;

use crate::ast::TemplateNode;
use crate::error::{TemplateError, TemplateResult};
use crate::evaluator::{Scope, evaluate};
use crate::locals::{Bindings, Locals, is_identifier};
use crate::parser::parse_template;
use crate::value::Value;

/// A parsed template, ready to be called any number of times.
///
/// Cloning is cheap: clones share the parsed template.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    source: String,
    params: Vec<String>,
    /// Set when the only parameter is a default key that receives all
    /// locals as one object.
    default_key: Option<String>,
    nodes: Vec<TemplateNode>,
}

impl CompiledTemplate {
    /// Compile template text against an ordered list of parameter names.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed placeholders, and an evaluation
    /// error when a name is not a valid identifier.
    pub fn compile<S: AsRef<str>>(text: &str, names: &[S]) -> TemplateResult<Self> {
        Self::build(text, names, None)
    }

    /// Compile template text in default-key mode: the template takes one
    /// argument bound to `key`, and [`CompiledTemplate::call_with`] passes
    /// every local as a property of it (`${$.title}`).
    pub fn compile_default_key(text: &str, key: &str) -> TemplateResult<Self> {
        Self::build(text, &[key], Some(key.to_string()))
    }

    fn build<S: AsRef<str>>(
        text: &str,
        names: &[S],
        default_key: Option<String>,
    ) -> TemplateResult<Self> {
        let params = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if is_identifier(name) {
                    Ok(name.to_string())
                } else {
                    Err(TemplateError::eval(format!(
                        "'{}' is not a valid parameter name",
                        name
                    )))
                }
            })
            .collect::<TemplateResult<Vec<_>>>()?;

        let nodes = parse_template(text)?;
        tracing::trace!(
            params = params.len(),
            nodes = nodes.len(),
            "compiled template"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                source: text.to_string(),
                params,
                default_key,
                nodes,
            }),
        })
    }

    /// Render with values bound to the parameters by position.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error if the number of values differs from the
    /// number of parameters, or if evaluating a placeholder fails.
    pub fn call(&self, values: &[Value]) -> TemplateResult<String> {
        let expected = self.inner.params.len();
        if values.len() != expected {
            return Err(TemplateError::eval(format!(
                "expected {} arguments, got {}",
                expected,
                values.len()
            )));
        }
        evaluate(&self.inner.nodes, &Scope::new(&self.inner.params, values))
    }

    /// Render with values looked up by parameter name.
    ///
    /// Parameters without a local are `undefined`. In default-key mode the
    /// locals are passed together as one object instead.
    pub fn call_with(&self, locals: &Locals) -> TemplateResult<String> {
        let values = match &self.inner.default_key {
            Some(key) => {
                Bindings::default_key(key.as_str(), locals.clone().into_object()).values
            }
            None => self
                .inner
                .params
                .iter()
                .map(|name| locals.get(name).cloned().unwrap_or_default())
                .collect(),
        };
        self.call(&values)
    }

    /// The parameter names, in binding order.
    pub fn params(&self) -> &[String] {
        &self.inner.params
    }

    /// The default key, when compiled in default-key mode.
    pub fn default_key(&self) -> Option<&str> {
        self.inner.default_key.as_deref()
    }

    /// The template text this was compiled from.
    pub fn source(&self) -> &str {
        &self.inner.source
    }
}

/// Split a comma-separated parameter list such as `"title, items"`.
///
/// Blank entries are dropped, so an empty string yields no names.
pub fn parse_param_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
