/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render litview views as axum responses.
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{Router, extract::State, response::Response, routing::get};
//! use litview::{Engine, Views};
//! use litview_axum::View;
//!
//! async fn index(State(views): State<Arc<Views>>) -> Response {
//!     View::new("index").local("title", "Welcome!").render(&views).await
//! }
//!
//! let views = Views::new("views")
//!     .with_default_extension("html")
//!     .with_engine("html", Engine::default());
//! let app: Router = Router::new()
//!     .route("/", get(index))
//!     .with_state(Arc::new(views));
//! ```

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use litview::{Locals, TemplateResult, Value, ViewOptions, Views};

const ERROR_BODY: &str = "Internal Server Error";

/// Render the view called `name` into a response.
///
/// A successful render is returned as `200 OK` HTML. Any error is logged and
/// answered with a plain-text `500 Internal Server Error`; the error itself
/// stays in the log, since it can name filesystem paths.
pub async fn render_view(views: &Views, name: &str, options: ViewOptions) -> Response {
    into_response(name, views.render(name, options).await)
}

fn into_response(name: &str, result: TemplateResult<String>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(view = name, error = %e, "failed to render view");
            (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY).into_response()
        }
    }
}

/// A view render being assembled in a handler.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    options: ViewOptions,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: ViewOptions::default(),
        }
    }

    /// Set a local.
    pub fn local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options = self.options.local(name, value);
        self
    }

    /// Replace all locals.
    pub fn locals(mut self, locals: Locals) -> Self {
        self.options = self.options.locals(locals);
        self
    }

    /// Register a partial.
    pub fn partial(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.options = self.options.partial(name, path);
        self
    }

    /// Render through `views`.
    pub async fn render(self, views: &Views) -> Response {
        render_view(views, &self.name, self.options).await
    }
}
