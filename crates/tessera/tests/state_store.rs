use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use tessera::state::{PathSegment, UpdateArgs};
use tessera::{StateError, StateStore, UpdateOperation, Value};

fn counter(store: &StateStore, field: &str) -> (Rc<Cell<usize>>, tessera::Subscription) {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let subscription = store.subscribe(field, move |_| seen.set(seen.get() + 1));
    (calls, subscription)
}

#[test]
fn every_mutation_notifies_each_listener_exactly_once() {
    let store = StateStore::with_fields([("count", Value::from(0)), ("items", Value::from(json!([])))]);
    let (a, _sa) = counter(&store, "count");
    let (b, _sb) = counter(&store, "count");
    let (other, _so) = counter(&store, "items");

    store.set("count", Value::from(1)).unwrap();
    store.update("count", UpdateOperation::Increment, &UpdateArgs::none()).unwrap();
    // Writing the same value still notifies.
    store.set("count", Value::from(2)).unwrap();

    assert_eq!((a.get(), b.get()), (3, 3));
    assert_eq!(other.get(), 0);
}

#[test]
fn listeners_receive_the_new_value() {
    let store = StateStore::with_fields([("name", Value::from("a"))]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _sub = store.subscribe("name", move |value| sink.borrow_mut().push(value.clone()));

    store.set("name", Value::from("b")).unwrap();
    store.set("name", Value::from("c")).unwrap();

    assert_eq!(*seen.borrow(), [Value::from("b"), Value::from("c")]);
}

#[test]
fn unsubscribing_during_a_round_skips_the_listener() {
    let store = StateStore::with_fields([("n", Value::from(0))]);
    let second_calls = Rc::new(Cell::new(0));
    let victim: Rc<RefCell<Option<tessera::Subscription>>> = Rc::default();

    let slot = victim.clone();
    let _first = store.subscribe("n", move |_| {
        slot.borrow_mut().take();
    });
    let calls = second_calls.clone();
    *victim.borrow_mut() = Some(store.subscribe("n", move |_| calls.set(calls.get() + 1)));

    store.set("n", Value::from(1)).unwrap();
    store.set("n", Value::from(2)).unwrap();

    assert_eq!(second_calls.get(), 0);
    assert_eq!(store.listener_count("n"), 1);
}

#[test]
fn a_listener_may_write_another_field() {
    let store = StateStore::with_fields([("a", Value::from(1)), ("b", Value::from(0))]);
    let writer = store.clone();
    let _sub = store.subscribe("a", move |value| {
        writer.set("b", Value::Number(value.to_number() * 10.0)).unwrap();
    });

    store.set("a", Value::from(4)).unwrap();

    assert_eq!(store.get("b"), Value::from(40));
}

#[test]
fn toggle_twice_restores_the_value() {
    let store = StateStore::with_fields([("open", Value::Bool(false))]);
    store.update("open", UpdateOperation::Toggle, &UpdateArgs::none()).unwrap();
    assert_eq!(store.get("open"), Value::Bool(true));
    store.update("open", UpdateOperation::Toggle, &UpdateArgs::none()).unwrap();
    assert_eq!(store.get("open"), Value::Bool(false));
}

#[test]
fn set_path_rebuilds_only_the_path() {
    let store = StateStore::with_fields([(
        "user",
        Value::from(json!({ "profile": { "name": "Ada" }, "tags": ["x"] })),
    )]);
    let before = store.get("user");

    store
        .set_path("user", &PathSegment::parse_dotted("profile.name"), Value::from("Grace"))
        .unwrap();

    let after = store.get("user");
    assert_eq!(after.get_path("profile.name"), Value::from("Grace"));
    assert_eq!(before.get_path("profile.name"), Value::from("Ada"));
    match (before.get("tags"), after.get("tags")) {
        (Value::List(old), Value::List(new)) => assert!(std::sync::Arc::ptr_eq(&old, &new)),
        other => panic!("tags should stay a list: {other:?}"),
    }
}

#[test]
fn set_path_rejects_indices_beyond_the_end_of_a_list() {
    let store = StateStore::with_fields([("rows", Value::from(json!([{ "x": 0 }])))]);
    let (calls, _sub) = counter(&store, "rows");

    for path in ["18446744073709551615.x", "100000000000.x", "2.x"] {
        let result = store.set_path("rows", &PathSegment::parse_dotted(path), Value::from(1));
        assert!(
            matches!(result, Err(StateError::IndexOutOfBounds { len: 1, .. })),
            "{path}: {result:?}"
        );
    }
    assert_eq!(calls.get(), 0);
    assert_eq!(store.get("rows"), Value::from(json!([{ "x": 0 }])));

    store
        .set_path("rows", &PathSegment::parse_dotted("1.x"), Value::from(1))
        .unwrap();
    assert_eq!(store.get("rows"), Value::from(json!([{ "x": 0 }, { "x": 1 }])));
    assert_eq!(calls.get(), 1);
}

#[test]
fn rejected_mutations_leave_state_and_listeners_alone() {
    let store = StateStore::with_fields([("items", Value::from(json!([1, 2])))]);
    let (calls, _sub) = counter(&store, "items");

    let out_of_bounds = store.update(
        "items",
        UpdateOperation::ReplaceAt,
        &UpdateArgs::at(5).with_value(9),
    );
    assert!(matches!(out_of_bounds, Err(StateError::IndexOutOfBounds { .. })));
    assert_eq!(
        store.update_named("items", "shuffle", &UpdateArgs::none()),
        Err(StateError::UnknownOperation("shuffle".to_string()))
    );
    assert!(matches!(
        store.set("missing", Value::Null),
        Err(StateError::UnknownField(_))
    ));

    assert_eq!(calls.get(), 0);
    assert_eq!(store.get("items"), Value::from(json!([1, 2])));
}

#[test]
fn list_operations() {
    let store = StateStore::with_fields([("items", Value::from(json!(["a", "b", "c"])))]);
    store.update("items", UpdateOperation::Push, &UpdateArgs::value("d")).unwrap();
    store.update("items", UpdateOperation::Remove, &UpdateArgs::at(0)).unwrap();
    store
        .update("items", UpdateOperation::InsertAt, &UpdateArgs::at(1).with_value("x"))
        .unwrap();
    store
        .update(
            "items",
            UpdateOperation::Splice,
            &UpdateArgs::at(2).with_delete_count(1).with_value(Value::from(json!(["y", "z"]))),
        )
        .unwrap();
    store.update("items", UpdateOperation::Pop, &UpdateArgs::none()).unwrap();

    assert_eq!(store.get("items"), Value::from(json!(["b", "x", "y", "z"])));
}
