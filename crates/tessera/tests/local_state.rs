mod common;

use common::*;
use serde_json::json;
use tessera::{DiagnosticKind, Value};

fn counter(label: &str) -> serde_json::Value {
    json!({
        "kind": "localState",
        "state": { "count": field("number", json!(0)) },
        "actions": [action("bump", json!([
            { "do": "update", "target": "count", "operation": "increment" }
        ]))],
        "child": el("button", json!({ "data-label": lit(json!(label)), "onClick": on("click", "bump") }), json!([
            text(state("count")),
        ])),
    })
}

#[test]
fn sibling_instances_do_not_share_state() {
    let (app, sink) = mount(json!({
        "view": el("div", json!({}), json!([counter("a"), counter("b")])),
    }));
    let buttons = elements(&app, "button");

    click(&app, buttons[0]);
    click(&app, buttons[0]);
    click(&app, buttons[1]);

    assert_eq!(texts(&app, "button"), ["2", "1"]);
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn every_list_item_gets_its_own_instance() {
    let (app, _) = mount(json!({
        "state": { "rows": field("array", json!(["x", "y", "z"])) },
        "view": el("div", json!({}), json!([{
            "kind": "each",
            "items": state("rows"),
            "as": "row",
            "key": var("row"),
            "body": counter("row"),
        }])),
    }));
    let buttons = elements(&app, "button");
    click(&app, buttons[2]);
    assert_eq!(texts(&app, "button"), ["0", "0", "1"]);

    // Reordering reuses the instance together with its state.
    app.store()
        .set("rows", Value::from(json!(["z", "x", "y"])))
        .unwrap();
    assert_eq!(texts(&app, "button"), ["1", "0", "0"]);
}

#[test]
fn local_actions_reject_external_steps() {
    let (app, sink) = mount(json!({
        "view": {
            "kind": "localState",
            "state": { "saved": field("boolean", json!(false)) },
            "actions": [action("save", json!([
                { "do": "fetch", "url": "/api/save" },
                { "do": "set", "target": "saved", "value": lit(json!(true)) },
            ]))],
            "child": el("button", json!({ "onClick": on("click", "save") }), json!([
                text(json!({ "expr": "cond", "if": state("saved"), "then": lit(json!("saved")), "else": lit(json!("save")) })),
            ])),
        },
    }));

    click(&app, element(&app, "button"));

    assert_eq!(sink.count(DiagnosticKind::UnsupportedLocalStep), 1);
    assert_eq!(texts(&app, "button"), ["saved"]);
}

#[test]
fn undeclared_fields_fall_through_to_the_global_store() {
    let (app, _) = mount(json!({
        "state": { "total": field("number", json!(10)) },
        "actions": [action("reset", json!([
            { "do": "set", "target": "total", "value": lit(json!(0)) }
        ]))],
        "view": {
            "kind": "localState",
            "state": { "mine": field("number", json!(0)) },
            "actions": [action("add", json!([
                { "do": "update", "target": "total", "operation": "increment", "value": lit(json!(5)) },
                { "do": "update", "target": "mine", "operation": "increment" },
            ]))],
            "child": el("div", json!({}), json!([
                el("button", json!({ "id": lit(json!("add")), "onClick": on("click", "add") }), json!([])),
                el("button", json!({ "id": lit(json!("reset")), "onClick": on("click", "reset") }), json!([])),
                el("span", json!({}), json!([text(state("total"))])),
                el("b", json!({}), json!([text(state("mine"))])),
            ])),
        },
    }));
    let buttons = elements(&app, "button");

    click(&app, buttons[0]);
    assert_eq!(app.store().get("total"), Value::from(15));
    assert_eq!(texts(&app, "span"), ["15"]);
    assert_eq!(texts(&app, "b"), ["1"]);

    // Global actions stay reachable from inside the instance.
    click(&app, buttons[1]);
    assert_eq!(texts(&app, "span"), ["0"]);
}
