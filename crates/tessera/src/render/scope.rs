//! Cleanup scopes.
//!
//! Every rendered subtree that can be torn down on its own (the app root, a branch
//! of an `if`, an item of an `each`, a local-state instance) owns a scope in the
//! arena. Ownership flows parent to child only: a scope owns its child scopes and
//! its cleanups, the parent index exists for diagnostics.

use std::fmt;

use crate::state::Subscription;

/// Generation-tagged slot index. A disposed scope's slot is reused with a bumped
/// generation, so an id held past disposal never matches the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

impl ScopeId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}v{}", self.index, self.generation)
    }
}

/// A resource released when its scope is disposed.
pub enum Cleanup {
    /// Store subscription of a binding.
    Unsubscribe(Subscription),
    Run(Box<dyn FnOnce()>),
}

impl Cleanup {
    pub fn run(self) {
        match self {
            Cleanup::Unsubscribe(subscription) => subscription.unsubscribe(),
            Cleanup::Run(f) => f(),
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleanup::Unsubscribe(subscription) => {
                f.debug_tuple("Unsubscribe").field(subscription).finish()
            }
            Cleanup::Run(_) => f.write_str("Run(..)"),
        }
    }
}

struct ScopeData {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    cleanups: Vec<Cleanup>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    scope: Option<ScopeData>,
}

/// Arena of live scopes. Freed slots go on a free list and are reused.
#[derive(Default)]
pub struct ScopeArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a scope, registered as the last child of `parent`.
    pub fn create(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let parent = parent.filter(|p| self.is_alive(*p));
        let data = ScopeData {
            parent,
            children: Vec::new(),
            cleanups: Vec::new(),
        };
        let id = match self.free_list.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.scope = Some(data);
                ScopeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    scope: Some(data),
                });
                ScopeId { index, generation: 0 }
            }
        };
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    fn get(&self, id: ScopeId) -> Option<&ScopeData> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)?
            .scope
            .as_ref()
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut ScopeData> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?
            .scope
            .as_mut()
    }

    /// Empties the slot and bumps its generation so `id` goes stale immediately.
    fn free(&mut self, id: ScopeId) -> Option<ScopeData> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let data = slot.scope.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(data)
    }

    pub fn is_alive(&self, id: ScopeId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id)?.parent
    }

    /// Registers a cleanup. When the scope is already gone the cleanup is handed
    /// back and the caller must run it.
    #[must_use]
    pub fn add_cleanup(&mut self, id: ScopeId, cleanup: Cleanup) -> Option<Cleanup> {
        match self.get_mut(id) {
            Some(scope) => {
                scope.cleanups.push(cleanup);
                None
            }
            None => Some(cleanup),
        }
    }

    /// Removes `id` and all its descendants from the arena and returns their
    /// cleanups in disposal order: for every scope, its children first (in creation
    /// order, recursively), then its own cleanups in registration order.
    ///
    /// Nothing is run here, so the caller can release its borrow of the arena first.
    pub fn take_for_disposal(&mut self, id: ScopeId) -> Vec<Cleanup> {
        if let Some(parent) = self.parent(id).and_then(|p| self.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        let mut ordered = Vec::new();
        self.drain_into(id, &mut ordered);
        ordered
    }

    fn drain_into(&mut self, id: ScopeId, ordered: &mut Vec<Cleanup>) {
        let Some(scope) = self.free(id) else {
            return;
        };
        for child in scope.children {
            self.drain_into(child, ordered);
        }
        ordered.extend(scope.cleanups);
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Slots ever allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cleanup_count(&self, id: ScopeId) -> usize {
        self.get(id).map_or(0, |s| s.cleanups.len())
    }
}
