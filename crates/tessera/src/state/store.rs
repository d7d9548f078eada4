//! The reactive state store.
//!
//! A `StateStore` is a cheap-to-clone handle over named fields. Mutations notify
//! synchronously before returning: exactly one call per subscribed listener per
//! successful mutation, no equality suppression.
//!
//! Listeners are snapshotted before a notification round and no store borrow is
//! held while they run, so listeners may read, subscribe, unsubscribe and even
//! mutate the store. A listener whose [`Subscription`] is dropped mid-round is
//! skipped for the rest of that round.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::path::{self, PathSegment};
use super::update::{UpdateArgs, UpdateOperation};
use crate::error::StateError;
use crate::value::Value;

type Callback = Rc<dyn Fn(&Value)>;

struct Listener {
    id: u64,
    active: Rc<Cell<bool>>,
    callback: Callback,
}

struct StoreInner {
    fields: RefCell<IndexMap<Arc<str>, Value>>,
    listeners: RefCell<FxHashMap<Arc<str>, Vec<Listener>>>,
    next_listener: Cell<u64>,
}

#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

impl StateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_fields(std::iter::empty::<(Arc<str>, Value)>())
    }

    /// Creates a store from already-resolved `(name, initial value)` pairs.
    pub fn with_fields(fields: impl IntoIterator<Item = (impl Into<Arc<str>>, Value)>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                fields: RefCell::new(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()),
                listeners: RefCell::new(FxHashMap::default()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Current value of a field, `undefined` for unknown fields.
    pub fn get(&self, name: &str) -> Value {
        self.inner
            .fields
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Value at a path inside a field.
    pub fn get_at(&self, name: &str, path: &[PathSegment]) -> Value {
        path::lookup(&self.get(name), path)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.fields.borrow().contains_key(name)
    }

    pub fn field_names(&self) -> Vec<Arc<str>> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// All fields as one object value.
    pub fn snapshot(&self) -> Value {
        Value::Object(Arc::new(self.inner.fields.borrow().clone()))
    }

    /// Replaces a field wholesale.
    pub fn set(&self, name: &str, value: Value) -> Result<(), StateError> {
        let key = self.write(name, |_| Ok(value))?;
        self.notify(&key);
        Ok(())
    }

    /// Replaces the value at `path` inside a field, rebuilding only the containers on
    /// the path. An empty path behaves like [`StateStore::set`].
    pub fn set_path(
        &self,
        name: &str,
        path: &[PathSegment],
        value: Value,
    ) -> Result<(), StateError> {
        let key = self.write(name, |current| path::assign(current, path, value))?;
        self.notify(&key);
        Ok(())
    }

    /// Applies a named operation.
    pub fn update(
        &self,
        name: &str,
        operation: UpdateOperation,
        args: &UpdateArgs,
    ) -> Result<(), StateError> {
        let key = self.write(name, |current| operation.apply(current, args))?;
        self.notify(&key);
        Ok(())
    }

    /// Like [`StateStore::update`] with the operation given by name.
    pub fn update_named(
        &self,
        name: &str,
        operation: &str,
        args: &UpdateArgs,
    ) -> Result<(), StateError> {
        self.update(name, operation.parse()?, args)
    }

    /// Registers a listener for a field. The listener receives the new field value.
    ///
    /// Subscribing to a field the store does not declare is allowed; the listener
    /// simply never fires.
    pub fn subscribe(&self, name: &str, listener: impl Fn(&Value) + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        let active = Rc::new(Cell::new(true));
        let field: Arc<str> = self
            .inner
            .fields
            .borrow()
            .get_key_value(name)
            .map_or_else(|| Arc::from(name), |(k, _)| k.clone());
        self.inner
            .listeners
            .borrow_mut()
            .entry(field.clone())
            .or_default()
            .push(Listener {
                id,
                active: active.clone(),
                callback: Rc::new(listener),
            });
        Subscription {
            store: Rc::downgrade(&self.inner),
            field,
            id,
            active,
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(name)
            .map_or(0, Vec::len)
    }

    /// True when both handles point at the same store.
    pub fn ptr_eq(&self, other: &StateStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn write(
        &self,
        name: &str,
        next: impl FnOnce(&Value) -> Result<Value, StateError>,
    ) -> Result<Arc<str>, StateError> {
        let mut fields = self.inner.fields.borrow_mut();
        let Some((_, key, slot)) = fields.get_full_mut(name) else {
            return Err(StateError::UnknownField(name.into()));
        };
        let key = key.clone();
        *slot = next(slot)?;
        Ok(key)
    }

    fn notify(&self, name: &Arc<str>) {
        let snapshot: Vec<(Rc<Cell<bool>>, Callback)> = match self.inner.listeners.borrow().get(name)
        {
            Some(listeners) => listeners
                .iter()
                .map(|l| (l.active.clone(), l.callback.clone()))
                .collect(),
            None => return,
        };
        let value = self.get(name);
        log::trace!("notify `{name}`: {} listener(s)", snapshot.len());
        for (active, callback) in snapshot {
            if active.get() {
                callback(&value);
            }
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("fields", &self.inner.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handle returned by [`StateStore::subscribe`].
///
/// Dropping it (or calling [`Subscription::unsubscribe`]) removes the listener.
/// Outliving the store is harmless.
pub struct Subscription {
    store: Weak<StoreInner>,
    field: Arc<str>,
    id: u64,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
        let Some(store) = self.store.upgrade() else {
            return;
        };
        // The callback is dropped after the borrow ends: it may own handles whose
        // own drop touches this store.
        let removed = {
            let mut listeners = store.listeners.borrow_mut();
            let Some(entries) = listeners.get_mut(&self.field) else {
                return;
            };
            let removed = entries
                .iter()
                .position(|l| l.id == self.id)
                .map(|pos| entries.remove(pos));
            if entries.is_empty() {
                listeners.remove(&self.field);
            }
            removed
        };
        drop(removed);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("field", &self.field)
            .field("active", &self.active.get())
            .finish()
    }
}
