use std::cell::RefCell;

use serde_json::json;
use tessera::eval::{StateSource, dependencies};
use tessera::{EvalContext, Expression, Tables, Value, evaluate};

/// State source that records every field read.
struct Recording {
    state: Value,
    reads: RefCell<Vec<String>>,
}

impl Recording {
    fn new(state: serde_json::Value) -> Self {
        Self {
            state: Value::from(state),
            reads: RefCell::default(),
        }
    }
}

impl StateSource for Recording {
    fn read(&self, name: &str) -> Value {
        self.reads.borrow_mut().push(name.to_string());
        self.state.get(name)
    }
}

fn expr(source: serde_json::Value) -> Expression {
    serde_json::from_value(source).expect("expression should deserialize")
}

fn eval_with(source: serde_json::Value, state: &dyn StateSource) -> Value {
    let tables = Tables::default();
    evaluate(&expr(source), &EvalContext::new(state, &tables))
}

fn eval(source: serde_json::Value, state: serde_json::Value) -> Value {
    eval_with(source, &Value::from(state))
}

fn lambda(param: &str, body: serde_json::Value) -> serde_json::Value {
    json!({ "expr": "lambda", "param": param, "body": body })
}

fn call(target: serde_json::Value, method: &str, args: serde_json::Value) -> serde_json::Value {
    json!({ "expr": "call", "target": target, "method": method, "args": args })
}

fn done(param: &str) -> serde_json::Value {
    json!({ "expr": "var", "name": param, "path": "done" })
}

#[test]
fn the_untaken_branch_is_never_evaluated() {
    let state = Recording::new(json!({ "flag": true, "a": 1, "b": 2 }));
    let value = eval_with(
        json!({
            "expr": "cond",
            "if": { "expr": "state", "name": "flag" },
            "then": { "expr": "state", "name": "a" },
            "else": { "expr": "state", "name": "b" },
        }),
        &state,
    );
    assert_eq!(value, Value::from(1));
    assert_eq!(*state.reads.borrow(), ["flag", "a"]);
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let state = Recording::new(json!({ "user": null, "name": "x" }));
    let value = eval_with(
        json!({
            "expr": "bin", "op": "&&",
            "left": { "expr": "state", "name": "user" },
            "right": { "expr": "state", "name": "name" },
        }),
        &state,
    );
    assert_eq!(value, Value::Null);
    assert_eq!(*state.reads.borrow(), ["user"]);
}

#[test]
fn filter_some_and_every() {
    let todos = json!({ "todos": [
        { "title": "a", "done": true },
        { "title": "b", "done": false },
        { "title": "c", "done": true },
    ] });
    let list = json!({ "expr": "state", "name": "todos" });

    let filtered = eval(
        call(list.clone(), "filter", json!([lambda("t", done("t"))])),
        todos.clone(),
    );
    let titles: Vec<Value> = filtered
        .as_list()
        .unwrap()
        .iter()
        .map(|todo| todo.get("title"))
        .collect();
    assert_eq!(titles, [Value::from("a"), Value::from("c")]);

    assert_eq!(
        eval(call(list.clone(), "some", json!([lambda("t", done("t"))])), todos.clone()),
        Value::Bool(true)
    );
    assert_eq!(
        eval(call(list.clone(), "every", json!([lambda("t", done("t"))])), todos.clone()),
        Value::Bool(false)
    );
    assert_eq!(
        eval(call(list, "every", json!([lambda("t", done("t"))])), json!({ "todos": [] })),
        Value::Bool(true)
    );
}

#[test]
fn map_find_and_find_index() {
    let state = json!({ "n": [1, 2, 3, 4] });
    let list = json!({ "expr": "state", "name": "n" });
    let double = lambda(
        "x",
        json!({ "expr": "bin", "op": "*", "left": { "expr": "var", "name": "x" }, "right": { "expr": "lit", "value": 2 } }),
    );
    let above_two = lambda(
        "x",
        json!({ "expr": "bin", "op": ">", "left": { "expr": "var", "name": "x" }, "right": { "expr": "lit", "value": 2 } }),
    );

    assert_eq!(
        eval(call(list.clone(), "map", json!([double])), state.clone()),
        Value::from(json!([2, 4, 6, 8]))
    );
    assert_eq!(
        eval(call(list.clone(), "find", json!([above_two.clone()])), state.clone()),
        Value::from(3)
    );
    assert_eq!(
        eval(call(list, "findIndex", json!([above_two])), state),
        Value::from(2)
    );
}

#[test]
fn higher_order_methods_on_non_lists_are_undefined() {
    let value = eval(
        call(
            json!({ "expr": "state", "name": "count" }),
            "filter",
            json!([lambda("x", json!({ "expr": "lit", "value": true }))]),
        ),
        json!({ "count": 3 }),
    );
    assert_eq!(value, Value::Undefined);
}

#[test]
fn missing_paths_are_undefined_not_errors() {
    let state = json!({ "user": { "profile": null } });
    assert_eq!(
        eval(json!({ "expr": "state", "name": "user", "path": "profile.name.first" }), state.clone()),
        Value::Undefined
    );
    assert_eq!(
        eval(json!({ "expr": "var", "name": "unbound" }), state),
        Value::Undefined
    );
}

#[test]
fn style_presets_resolve_through_the_tables() {
    let mut tables = Tables::default();
    tables.styles = serde_json::from_value(json!({
        "button": {
            "base": "btn",
            "variants": { "size": { "sm": "btn-sm", "lg": "btn-lg" } },
            "defaultVariants": { "size": "sm" },
        }
    }))
    .unwrap();
    let state = Value::from(json!({ "big": true }));
    let ctx = EvalContext::new(&state, &tables);

    let default = expr(json!({ "expr": "style", "name": "button" }));
    assert_eq!(evaluate(&default, &ctx), Value::from("btn btn-sm"));

    let chosen = expr(json!({
        "expr": "style", "name": "button",
        "variants": { "size": { "expr": "cond",
            "if": { "expr": "state", "name": "big" },
            "then": { "expr": "lit", "value": "lg" },
            "else": { "expr": "lit", "value": "sm" } } }
    }));
    assert_eq!(evaluate(&chosen, &ctx), Value::from("btn btn-lg"));

    let unknown = expr(json!({ "expr": "style", "name": "missing" }));
    assert_eq!(evaluate(&unknown, &ctx), Value::from(""));
}

#[test]
fn dependencies_follow_every_branch_and_skip_lambda_parameters() {
    let deps = dependencies(&expr(call(
        json!({ "expr": "state", "name": "todos" }),
        "filter",
        json!([lambda(
            "t",
            json!({ "expr": "bin", "op": "==",
                "left": done("t"),
                "right": { "expr": "state", "name": "showDone" } })
        )]),
    )));
    let state: Vec<&str> = deps.state.iter().map(|name| &**name).collect();
    assert_eq!(state, ["todos", "showDone"]);
    assert!(deps.locals.is_empty());
}
