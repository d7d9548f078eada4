mod common;

use common::*;
use serde_json::json;
use tessera::{App, AppOptions, CollectingSink, DiagnosticKind, RenderConfig, Value, render_to_string};

#[test]
fn elements_text_and_attributes_are_escaped() {
    let html = render_to_string(
        program(json!({
            "state": { "title": field("string", json!("<b>&</b>")) },
            "view": el("div", json!({ "title": state("title"), "hidden": lit(json!(false)) }), json!([
                text(state("title")),
                el("br", json!({}), json!([])),
            ])),
        })),
        RenderConfig::default(),
    );
    assert_eq!(
        html,
        r#"<div title="&lt;b&gt;&amp;&lt;/b&gt;">&lt;b&gt;&amp;&lt;/b&gt;<br></div>"#
    );
}

#[test]
fn markdown_renders_and_escapes_raw_html() {
    let html = render_to_string(
        program(json!({
            "state": { "doc": field("string", json!("# Hi\n\nsay <script>x</script> *there*")) },
            "view": { "kind": "markdown", "content": state("doc") },
        })),
        RenderConfig::default(),
    );
    assert!(html.starts_with(r#"<div class="markdown"><h1>Hi</h1>"#));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("<em>there</em>"));
    assert!(!html.contains("<script>"));
}

#[test]
fn code_blocks_carry_their_language() {
    let html = render_to_string(
        program(json!({
            "view": { "kind": "code", "language": lit(json!("rust")), "content": lit(json!("fn main() {}")) },
        })),
        RenderConfig::default(),
    );
    assert_eq!(html, r#"<pre><code class="language-rust">fn main() {}</code></pre>"#);
}

#[test]
fn markers_are_emitted_on_request() {
    let source = json!({
        "state": { "items": field("array", json!(["a"])) },
        "view": el("ul", json!({}), json!([{
            "kind": "each",
            "items": state("items"),
            "as": "x",
            "body": el("li", json!({}), json!([text(var("x"))])),
        }])),
    });
    let plain = render_to_string(program(source.clone()), RenderConfig::default());
    assert_eq!(plain, "<ul><li>a</li></ul>");

    let marked = render_to_string(
        program(source),
        RenderConfig {
            markers: true,
            ..RenderConfig::default()
        },
    );
    assert_eq!(marked, "<ul><!--each--><li>a</li><!--/each--></ul>");
}

#[test]
fn portals_render_into_their_container() {
    let mut app = App::new(
        program(json!({
            "state": { "open": field("boolean", json!(true)) },
            "view": el("main", json!({}), json!([{
                "kind": "if",
                "condition": state("open"),
                "then": { "kind": "portal", "target": "modal", "children": [
                    el("dialog", json!({}), json!([text(lit(json!("hello")))])),
                ] },
            }])),
        })),
        AppOptions::default(),
    );
    app.create_container("modal");
    app.mount();

    assert_eq!(app.to_html(), "<main></main>");
    assert_eq!(app.container_html("modal").as_deref(), Some("<dialog>hello</dialog>"));

    app.store().set("open", Value::Bool(false)).unwrap();
    assert_eq!(app.container_html("modal").as_deref(), Some(""));
}

#[test]
fn a_missing_portal_target_renders_in_place() {
    let sink = CollectingSink::new();
    let mut app = App::new(
        program(json!({
            "view": el("main", json!({}), json!([
                { "kind": "portal", "target": "nowhere", "children": [text(lit(json!("inline")))] },
            ])),
        })),
        AppOptions::default().with_diagnostics(sink.clone()),
    );
    app.mount();

    assert_eq!(app.to_html(), "<main>inline</main>");
    assert_eq!(sink.count(DiagnosticKind::PortalTarget), 1);
}

#[test]
fn route_params_are_visible_to_the_view() {
    let mut route = tessera::RouteContext::default();
    route.params.insert("id".to_string(), "42".to_string());
    let mut app = App::new(
        program(json!({
            "view": el("h1", json!({}), json!([text(json!({ "expr": "route", "name": "id" }))])),
        })),
        AppOptions::default().with_route(route),
    );
    app.mount();
    assert_eq!(app.to_html(), "<h1>42</h1>");
}
