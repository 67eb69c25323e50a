/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for litview using test fixtures.
 */

use std::path::{Path, PathBuf};

use litview::{
    Engine, EngineConfig, Locals, RenderOptions, TemplateError, Value, ViewOptions, Views,
};
use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("tests").join("fixtures")
}

/// Engine that resolves relative paths against the fixtures directory
fn fixture_engine() -> Engine {
    Engine::new(EngineConfig::new().with_root(fixtures_dir())).unwrap()
}

#[tokio::test]
async fn test_render_title() {
    let html = fixture_engine()
        .render(
            "title.html",
            RenderOptions::new().local("title", "Welcome!"),
        )
        .await
        .unwrap();
    assert_eq!(html, "<h1>Welcome!</h1>\n");
}

#[tokio::test]
async fn test_render_title_with_absolute_path() {
    let path = fixture_path("title.html");
    let html = litview::render(
        path.to_str().unwrap(),
        RenderOptions::new().local("title", "Welcome!"),
    )
    .await
    .unwrap();
    assert_eq!(html, "<h1>Welcome!</h1>\n");
}

#[tokio::test]
async fn test_ternary_with_nested_template_literal() {
    let engine = fixture_engine();

    let html = engine
        .render_file(
            "maintained.html",
            RenderOptions::new().local("maintainedBy", "Good Samaritans"),
        )
        .await
        .unwrap();
    assert_eq!(
        html,
        "<p>This is a template engine maintained by Good Samaritans.</p>\n"
    );

    let html = engine
        .render_file(
            "maintained.html",
            RenderOptions::new().local("maintainedBy", Value::Null),
        )
        .await
        .unwrap();
    assert_eq!(html, "<p>This is not maintained anymore.</p>\n");
}

#[test]
fn test_precompile_without_io() {
    let template = litview::compile("${engineName} - The fastest javascript template string engine!", "engineName").unwrap();
    assert_eq!(
        template.call(&[Value::from("jessica")]).unwrap(),
        "jessica - The fastest javascript template string engine!"
    );
    assert_eq!(
        template.call(&[Value::from("express")]).unwrap(),
        "express - The fastest javascript template string engine!"
    );
}

#[test]
fn test_template_without_placeholders_is_unchanged() {
    let text = "<p>Nothing to see: $ { } `quoted`</p>";
    let template = litview::compile(text, "").unwrap();
    assert_eq!(template.call(&[Value::Undefined]).unwrap(), text);
}

#[tokio::test]
async fn test_missing_template_is_file_read_error() {
    let err = fixture_engine()
        .render("does-not-exist.html", RenderOptions::new())
        .await
        .unwrap_err();

    match err {
        TemplateError::FileRead { path, source } => {
            assert_eq!(path, fixture_path("does-not-exist.html"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected FileRead, got {other:?}"),
    }
}

#[tokio::test]
async fn test_partial_is_substituted() {
    let html = fixture_engine()
        .render_str(
            "<body>${main}</body>",
            RenderOptions::new().partial("main", "main.html"),
        )
        .await
        .unwrap();
    assert_eq!(html, "<body><p>hi</p></body>");
}

#[tokio::test]
async fn test_layout_with_partials_sharing_locals() {
    let html = fixture_engine()
        .render_file(
            "layout.html",
            RenderOptions::new()
                .local("title", "Docs")
                .partial("header", "header.html")
                .partial("main", "main.html"),
        )
        .await
        .unwrap();
    assert_eq!(
        html,
        "<!DOCTYPE html>\n<html>\n<head><title>Docs</title></head>\n<body>\n<header>Docs</header>\n<p>hi</p>\n</body>\n</html>\n"
    );
}

#[tokio::test]
async fn test_partials_are_only_one_level_deep() {
    let err = fixture_engine()
        .render_str(
            "${nav}",
            RenderOptions::new()
                .local("title", "Docs")
                .partial("header", "header.html")
                .partial("nav", "nested.html"),
        )
        .await
        .unwrap_err();
    assert!(err.is_evaluation());
    assert_eq!(err.to_string(), "Evaluation error: header is not defined");
}

#[tokio::test]
async fn test_missing_partial_fails_whole_render() {
    let err = fixture_engine()
        .render_file(
            "title.html",
            RenderOptions::new()
                .local("title", "Docs")
                .partial("main", "no-such-partial.html"),
        )
        .await
        .unwrap_err();
    assert!(err.is_file_read());
}

#[tokio::test]
async fn test_list_iteration() {
    let locals = Locals::from_json(json!({
        "items": [
            {"name": "apple", "price": 1.5},
            {"name": "pear", "price": 0.25}
        ]
    }))
    .unwrap();

    let html = fixture_engine()
        .render_file("list.html", RenderOptions::new().locals(locals))
        .await
        .unwrap();
    assert_eq!(
        html,
        "<ul><li class=\"even\">APPLE: 1.50</li>\n<li class=\"odd\">PEAR: 0.25</li></ul>\n"
    );
}

#[tokio::test]
async fn test_escaped_placeholder() {
    let html = fixture_engine()
        .render_file("escapes.html", RenderOptions::new().local("price", 9.5))
        .await
        .unwrap();
    assert_eq!(html, "Price: ${price} is literal, 9.5 is not.\n");
}

#[tokio::test]
async fn test_default_key_precompiled_file() {
    let template = fixture_engine()
        .precompile_file("default_key.html", "")
        .await
        .unwrap();
    assert_eq!(template.params(), ["$".to_string()]);

    let site = Value::from(json!({"site": {"name": "Docs"}}));
    assert_eq!(template.call(&[site]).unwrap(), "Docs | Untitled");

    let page = Value::from(json!({"site": {"name": "Docs"}, "page": {"title": "Intro"}}));
    assert_eq!(template.call(&[page]).unwrap(), "Docs | Intro");
}

#[tokio::test]
async fn test_default_key_precompiled_file_with_locals() {
    let template = fixture_engine()
        .precompile_file("default_key.html", "")
        .await
        .unwrap();
    let locals = Locals::new()
        .with("site", json!({"name": "Docs"}))
        .with("page", json!({"title": "Intro"}));
    assert_eq!(template.call_with(&locals).unwrap(), "Docs | Intro");
}

#[tokio::test]
async fn test_arity_mismatch_is_evaluation_error() {
    let template = fixture_engine()
        .precompile_file("default_key.html", "")
        .await
        .unwrap();
    let err = template.call(&[]).unwrap_err();
    assert!(err.is_evaluation());
}

#[tokio::test]
async fn test_locals_from_struct() {
    #[derive(Serialize)]
    struct Page {
        title: String,
        draft: bool,
    }

    let locals = Locals::from_serialize(&Page {
        title: "Release notes".to_string(),
        draft: true,
    })
    .unwrap();
    assert_eq!(locals.names().collect::<Vec<_>>(), vec!["title", "draft"]);

    let html = fixture_engine()
        .render_str(
            "${title}${draft ? ' (draft)' : ''}",
            RenderOptions::new().locals(locals),
        )
        .await
        .unwrap();
    assert_eq!(html, "Release notes (draft)");
}

#[tokio::test]
async fn test_inline_render_through_template_flag() {
    let html = litview::render(
        "${greeting}, ${name}!",
        RenderOptions::new()
            .local("greeting", "Hello")
            .local("name", "world")
            .template(true),
    )
    .await
    .unwrap();
    assert_eq!(html, "Hello, world!");
}

#[tokio::test]
async fn test_render_from_tempdir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("card.html"), "<div>${user.name}</div>").unwrap();

    let engine = Engine::new(EngineConfig::new().with_root(dir.path())).unwrap();
    let html = engine
        .render_file(
            "card.html",
            RenderOptions::new().local("user", json!({"name": "Ada"})),
        )
        .await
        .unwrap();
    assert_eq!(html, "<div>Ada</div>");
}

#[tokio::test]
async fn test_concurrent_renders_are_independent() {
    let engine = fixture_engine();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .render_file(
                        "title.html",
                        RenderOptions::new().local("title", format!("page {i}")),
                    )
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap().unwrap(), format!("<h1>page {i}</h1>\n"));
    }
}

#[tokio::test]
async fn test_views_registry_with_fixtures() {
    let views = Views::new(fixtures_dir())
        .with_default_extension("html")
        .with_engine("html", fixture_engine());

    let html = views
        .render("title", ViewOptions::new().local("title", "From views"))
        .await
        .unwrap();
    assert_eq!(html, "<h1>From views</h1>\n");
}
