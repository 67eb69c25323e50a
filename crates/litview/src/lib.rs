/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template-literal view engine.
//!
//! Templates are plain text with `${...}` placeholders, written the way
//! JavaScript template literals are:
//!
//! - Variable interpolation: `${title}`
//! - Nested field access: `${employee.salary}`, `${user?.address?.city}`
//! - Conditionals: ``${draft ? 'Draft' : `Published ${date}`}``
//! - Iteration: ``${items.map(item => `<li>${item}</li>`).join('')}``
//! - Partials: sub-templates rendered into a local before the main template
//!
//! Placeholders are evaluated by a small interpreter for a JavaScript
//! expression subset, so templates cannot run arbitrary code.
//!
//! # Example
//!
//! ```
//! use litview::{Engine, RenderOptions};
//!
//! # tokio_test_block(async {
//! let engine = Engine::default();
//! let html = engine
//!     .render_str("<h1>${title}</h1>", RenderOptions::new().local("title", "Welcome!"))
//!     .await?;
//! assert_eq!(html, "<h1>Welcome!</h1>");
//! # Ok::<(), litview::TemplateError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod loader;
pub mod locals;
pub mod methods;
pub mod parser;
pub mod partials;
pub mod renderer;
pub mod value;
pub mod views;

// Re-export main types at crate root
pub use compiler::{CompiledTemplate, parse_param_list};
pub use config::{DEFAULT_KEY, EngineConfig};
pub use engine::Engine;
pub use error::{TemplateError, TemplateResult};
pub use loader::{FileSystemLoader, MemoryLoader, SourceLoader};
pub use locals::{Bindings, Locals, is_identifier};
pub use partials::Partials;
pub use renderer::{RenderOptions, Source};
pub use value::Value;
pub use views::{ViewEngine, ViewOptions, Views};

/// Compile template text with the default engine.
///
/// See [`Engine::compile`].
pub fn compile(text: &str, params: &str) -> TemplateResult<CompiledTemplate> {
    Engine::default().compile(text, params)
}

/// Render a template with the default engine, reading paths relative to the
/// working directory.
///
/// See [`Engine::render`].
pub async fn render(source: &str, options: RenderOptions) -> TemplateResult<String> {
    Engine::default().render(source, options).await
}
