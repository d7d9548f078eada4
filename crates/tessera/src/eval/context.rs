//! Evaluation context: state source, local bindings and read-only tables.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use smallvec::SmallVec;

use crate::program::{CompiledProgram, StyleTable};
use crate::state::StateStore;
use crate::value::{ObjectMap, Value};

/// Anything `state` expressions can read from.
pub trait StateSource {
    fn read(&self, name: &str) -> Value;
}

impl StateSource for StateStore {
    fn read(&self, name: &str) -> Value {
        self.get(name)
    }
}

impl StateSource for ObjectMap {
    fn read(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }
}

/// A plain value used as state: its fields are the state fields.
impl StateSource for Value {
    fn read(&self, name: &str) -> Value {
        self.get(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Locals
// ═══════════════════════════════════════════════════════════════════════════

/// A local binding. Loop variables are `Reactive`: they read through a per-item cell
/// so a reused list item sees its new value and index without re-rendering.
#[derive(Clone)]
pub enum LocalValue {
    Value(Value),
    Reactive { store: StateStore, field: Arc<str> },
}

impl LocalValue {
    pub fn current(&self) -> Value {
        match self {
            LocalValue::Value(value) => value.clone(),
            LocalValue::Reactive { store, field } => store.get(field),
        }
    }
}

impl fmt::Debug for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            LocalValue::Reactive { field, .. } => {
                f.debug_struct("Reactive").field("field", field).finish()
            }
        }
    }
}

struct Frame {
    bindings: SmallVec<[(Arc<str>, LocalValue); 2]>,
    parent: Option<Rc<Frame>>,
}

/// Persistent chain of local frames.
///
/// Extending returns a new chain that shares every existing frame; the receiver is
/// never modified, so a lambda body or loop item only ever sees its own bindings
/// plus what was visible where it was created.
#[derive(Clone, Default)]
pub struct Locals {
    head: Option<Rc<Frame>>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, bindings: impl IntoIterator<Item = (Arc<str>, LocalValue)>) -> Self {
        let bindings: SmallVec<[(Arc<str>, LocalValue); 2]> = bindings.into_iter().collect();
        if bindings.is_empty() {
            return self.clone();
        }
        Self {
            head: Some(Rc::new(Frame {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn bind(&self, name: impl Into<Arc<str>>, value: Value) -> Self {
        self.extend([(name.into(), LocalValue::Value(value))])
    }

    /// Innermost binding for `name`.
    pub fn binding(&self, name: &str) -> Option<&LocalValue> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if let Some((_, value)) = current.bindings.iter().rev().find(|(n, _)| &**n == name) {
                return Some(value);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    /// Current value of `name`, `undefined` when unbound.
    pub fn get(&self, name: &str) -> Value {
        self.binding(name).map_or(Value::Undefined, LocalValue::current)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            for (name, _) in &current.bindings {
                list.entry(name);
            }
            frame = current.parent.as_deref();
        }
        list.finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Read-only tables
// ═══════════════════════════════════════════════════════════════════════════

/// The route the program is rendered for.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteContext {
    pub path: String,
    pub params: IndexMap<String, String>,
    pub query: IndexMap<String, String>,
}

/// Lookup tables threaded through evaluation instead of living in globals, so
/// independent programs never see each other's presets or data.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub styles: StyleTable,
    pub data: IndexMap<String, Value>,
    pub imports: IndexMap<String, Value>,
    pub route: RouteContext,
}

impl Tables {
    pub fn from_program(program: &CompiledProgram) -> Self {
        Self {
            styles: program.styles.clone(),
            data: program.data.clone(),
            imports: program.imports.clone(),
            route: RouteContext::default(),
        }
    }

    pub fn with_route(mut self, route: RouteContext) -> Self {
        self.route = route;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct EvalContext<'a> {
    pub state: &'a dyn StateSource,
    pub locals: Locals,
    pub tables: &'a Tables,
}

impl<'a> EvalContext<'a> {
    pub fn new(state: &'a dyn StateSource, tables: &'a Tables) -> Self {
        Self {
            state,
            locals: Locals::new(),
            tables,
        }
    }

    /// Same state and tables, different locals.
    pub fn with_locals(&self, locals: Locals) -> Self {
        Self {
            state: self.state,
            locals,
            tables: self.tables,
        }
    }
}
