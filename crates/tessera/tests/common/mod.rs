//! Shared harness for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value as Json, json};
use tessera::{App, AppOptions, CollectingSink, CompiledProgram, NodeId, RenderConfig, Value};

pub fn program(source: Json) -> Arc<CompiledProgram> {
    Arc::new(CompiledProgram::from_value(source).expect("test program should deserialize"))
}

pub fn mount(source: Json) -> (App, CollectingSink) {
    mount_with(source, RenderConfig::default())
}

pub fn mount_with(source: Json, config: RenderConfig) -> (App, CollectingSink) {
    let sink = CollectingSink::new();
    let options = AppOptions::default()
        .with_config(config)
        .with_diagnostics(sink.clone());
    let mut app = App::new(program(source), options);
    app.mount();
    (app, sink)
}

pub fn elements(app: &App, tag: &str) -> Vec<NodeId> {
    app.document().elements_by_tag(app.root(), tag)
}

pub fn element(app: &App, tag: &str) -> NodeId {
    let found = elements(app, tag);
    assert_eq!(found.len(), 1, "expected exactly one <{tag}>");
    found[0]
}

pub fn text_of(app: &App, node: NodeId) -> String {
    app.document().text_content(node)
}

pub fn texts(app: &App, tag: &str) -> Vec<String> {
    elements(app, tag)
        .into_iter()
        .map(|node| text_of(app, node))
        .collect()
}

pub fn click(app: &App, node: NodeId) -> usize {
    app.dispatch_event(node, "click", &Value::Undefined)
}

pub fn input(app: &App, node: NodeId, text: &str) -> usize {
    app.dispatch_event(node, "input", &Value::from(text))
}

// ═══════════════════════════════════════════════════════════════════════════
// Program builders
// ═══════════════════════════════════════════════════════════════════════════

pub fn lit(value: Json) -> Json {
    json!({ "expr": "lit", "value": value })
}

pub fn state(name: &str) -> Json {
    json!({ "expr": "state", "name": name })
}

pub fn var(name: &str) -> Json {
    json!({ "expr": "var", "name": name })
}

pub fn var_path(name: &str, path: &str) -> Json {
    json!({ "expr": "var", "name": name, "path": path })
}

pub fn text(value: Json) -> Json {
    json!({ "kind": "text", "value": value })
}

pub fn el(tag: &str, props: Json, children: Json) -> Json {
    json!({ "kind": "element", "tag": tag, "props": props, "children": children })
}

pub fn on(event: &str, action: &str) -> Json {
    json!({ "event": event, "action": action })
}

pub fn field(ty: &str, initial: Json) -> Json {
    json!({ "type": ty, "initial": initial })
}

pub fn action(name: &str, steps: Json) -> Json {
    json!({ "name": name, "steps": steps })
}

/// `todos` list of `{id, title}` objects rendered as keyed `<li>` items.
pub fn keyed_list(ids: &[i64]) -> Json {
    let todos: Vec<Json> = ids
        .iter()
        .map(|id| json!({ "id": id, "title": format!("todo {id}") }))
        .collect();
    json!({
        "state": { "todos": field("array", Json::Array(todos)) },
        "view": el("ul", json!({}), json!([{
            "kind": "each",
            "items": state("todos"),
            "as": "todo",
            "index": "i",
            "key": var_path("todo", "id"),
            "body": el("li", json!({ "data-id": var_path("todo", "id") }), json!([
                text(var_path("todo", "title")),
            ])),
        }])),
    })
}

pub fn todos(ids: &[i64]) -> Value {
    Value::from(Json::Array(
        ids.iter()
            .map(|id| json!({ "id": id, "title": format!("todo {id}") }))
            .collect(),
    ))
}
