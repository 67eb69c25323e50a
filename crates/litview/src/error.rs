/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during template operations.
///
/// Every compile or render call produces either its output or exactly one
/// of these; partial output is never returned alongside an error.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed placeholder or expression syntax.
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Failure while evaluating a placeholder expression.
    ///
    /// This also covers arity mismatches and invalid parameter names, which
    /// surface the same way an undefined name does.
    #[error("Evaluation error: {message}")]
    EvaluationError { message: String },

    /// A template or partial file could not be read.
    #[error("Failed to read template {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No view engine is registered for a view's file extension.
    #[error("No view engine registered for extension '{extension}'")]
    NoViewEngine { extension: String },
}

impl TemplateError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        TemplateError::ParseError {
            message: message.into(),
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        TemplateError::EvaluationError {
            message: message.into(),
        }
    }

    /// Whether this error came from reading a template or partial file.
    pub fn is_file_read(&self) -> bool {
        matches!(self, TemplateError::FileRead { .. })
    }

    /// Whether this error came from evaluating the template.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, TemplateError::EvaluationError { .. })
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
