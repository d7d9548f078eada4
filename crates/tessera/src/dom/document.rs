//! Arena-backed in-memory document.
//!
//! Nodes are addressed by generation-tagged [`NodeId`]s. A removed node's slot is
//! reused, but with a bumped generation, so an id held across updates still means
//! exactly one DOM node: equal ids mean the same node, and a stale id is dead.
//! Accessors on removed nodes return empty results instead of panicking.

use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// Identity of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text(String),
    Comment(String),
}

/// Callback attached to a node for one event name.
pub type EventCallback = Rc<dyn Fn(&Value)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct EventListener {
    id: ListenerId,
    event: String,
    callback: EventCallback,
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
    /// Live element state that is not reflected in attributes (`value`, `checked`).
    properties: FxHashMap<String, Value>,
    inner_html: Option<String>,
    listeners: Vec<EventListener>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: FxHashMap::default(),
            inner_html: None,
            listeners: Vec::new(),
        }
    }
}

/// Counters for DOM churn. `moved` counts re-insertions of an already attached node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DomStats {
    pub created: usize,
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

#[derive(Default)]
pub struct Document {
    nodes: Vec<Slot>,
    free_list: Vec<u32>,
    containers: IndexMap<String, NodeId>,
    focused: Option<NodeId>,
    stats: DomStats,
    next_listener: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Creation
    // ═══════════════════════════════════════════════════════════════════════

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.stats.created += 1;
        let node = Some(NodeData::new(kind));
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.nodes[index as usize];
            slot.node = node;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(Slot {
            generation: 0,
            node,
        });
        NodeId { index, generation: 0 }
    }

    /// Empties the slot and bumps its generation so `id` goes stale immediately.
    fn free(&mut self, id: NodeId) -> Option<NodeData> {
        let slot = self
            .nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let data = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(data)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.to_string()))
    }

    /// Creates a detached `<div id=name>` registered under `name`. Containers are
    /// where the app mounts and where portals render.
    pub fn create_container(&mut self, name: &str) -> NodeId {
        let id = self.create_element("div");
        self.set_attribute(id, "id", name);
        self.containers.insert(name.to_string(), id);
        id
    }

    pub fn container(&self, name: &str) -> Option<NodeId> {
        self.containers
            .get(name)
            .copied()
            .filter(|id| self.is_alive(*id))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Tree structure
    // ═══════════════════════════════════════════════════════════════════════

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)?
            .node
            .as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?
            .node
            .as_mut()
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|c| *c == id)?;
        siblings.get(position + 1).copied()
    }

    /// Inserts `child` into `parent` before `before` (appends when `before` is
    /// `None` or not a child of `parent`). An attached child is moved.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        if before == Some(child) || !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        let was_attached = self.detach(child);
        let Some(parent_data) = self.node_mut(parent) else {
            return;
        };
        let position = before
            .and_then(|b| parent_data.children.iter().position(|c| *c == b))
            .unwrap_or(parent_data.children.len());
        parent_data.children.insert(position, child);
        if let Some(child_data) = self.node_mut(child) {
            child_data.parent = Some(parent);
        }
        if was_attached {
            self.stats.moved += 1;
        } else {
            self.stats.inserted += 1;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Unlinks a node from its parent, keeping it alive. Returns whether it was attached.
    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(parent_data) = self.node_mut(parent) {
            parent_data.children.retain(|c| *c != id);
        }
        if let Some(data) = self.node_mut(id) {
            data.parent = None;
        }
        true
    }

    /// Detaches a node and destroys it together with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        self.stats.removed += 1;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(data) = self.free(current) {
                pending.extend(data.children);
            }
            if self.focused == Some(current) {
                self.focused = None;
            }
        }
    }

    /// Concatenated text of every text node under `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element { .. }) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            _ => {}
        }
    }

    /// Every element with `tag` under `root` (excluded), in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            if self.tag(id) == Some(tag) {
                found.push(id);
            }
            pending.extend(self.children(id).iter().rev().copied());
        }
        found
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Content
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(NodeKind::Text(current)) = self.node_mut(id).map(|n| &mut n.kind) {
            if current != text {
                *current = text.to_string();
            }
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(id) {
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(data) = self.node_mut(id) {
            data.attributes.shift_remove(name);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Sets a live property such as an input's current `value`.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) {
        if let Some(data) = self.node_mut(id) {
            data.properties.insert(name.to_string(), value);
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Value {
        self.node(id)
            .and_then(|n| n.properties.get(name).cloned())
            .unwrap_or_default()
    }

    pub fn set_inner_html(&mut self, id: NodeId, html: String) {
        if let Some(data) = self.node_mut(id) {
            data.inner_html = Some(html);
        }
    }

    pub fn inner_html(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.inner_html.as_deref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Focus and events
    // ═══════════════════════════════════════════════════════════════════════

    pub fn focus(&mut self, id: NodeId) {
        if self.is_alive(id) {
            self.focused = Some(id);
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn add_listener(&mut self, id: NodeId, event: &str, callback: EventCallback) -> ListenerId {
        let listener = ListenerId(self.next_listener);
        self.next_listener += 1;
        if let Some(data) = self.node_mut(id) {
            data.listeners.push(EventListener {
                id: listener,
                event: event.to_string(),
                callback,
            });
        }
        listener
    }

    /// Removes a listener and hands back its callback so the caller decides when it
    /// is dropped.
    pub fn remove_listener(&mut self, id: NodeId, listener: ListenerId) -> Option<EventCallback> {
        let data = self.node_mut(id)?;
        let position = data.listeners.iter().position(|l| l.id == listener)?;
        Some(data.listeners.remove(position).callback)
    }

    /// Snapshot of the callbacks registered for `event` on `id`.
    pub fn listeners(&self, id: NodeId, event: &str) -> Vec<EventCallback> {
        self.node(id).map_or_else(Vec::new, |n| {
            n.listeners
                .iter()
                .filter(|l| l.event == event)
                .map(|l| l.callback.clone())
                .collect()
        })
    }

    pub fn listener_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.listeners.len())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stats
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> DomStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DomStats::default();
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Slots ever allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }
}
