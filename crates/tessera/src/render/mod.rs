//! Renderer / reconciler.
//!
//! [`Renderer::render`] turns a compiled node into document nodes once and wires a
//! binding for every dynamic value. After that, state notifications patch the
//! document in place: bindings rewrite one attribute or text, conditionals swap
//! branches, keyed lists reconcile. Nothing is ever re-rendered wholesale.
//!
//! Borrow discipline: the document and the scope arena are borrowed only for
//! individual operations, never across a call that may run user callbacks (store
//! notifications, cleanups, event handlers).

mod actions;
mod binding;
mod conditional;
mod each;
mod element;
mod leaf;
mod local_state;
mod scope;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

pub use actions::{ActionHost, ExternalStep, NoHost};
pub(crate) use actions::run_named_action;
pub use each::{ItemKey, longest_increasing_subsequence};
pub use leaf::markdown_to_html;
pub use scope::{Cleanup, ScopeArena, ScopeId};

use crate::config::RenderConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, LogSink};
use crate::dom::{Document, NodeId};
use crate::eval::{EvalContext, Locals, StateSource, Tables, evaluate};
use crate::program::{ActionDefinition, Expression, Node};
use crate::state::{CookieSource, NoCookies, StateStore};
use crate::value::Value;

/// Named element handles registered through `ref`.
pub type RefRegistry = Rc<RefCell<IndexMap<String, NodeId>>>;

/// First and last top-level document node produced by rendering one compiled node.
/// Both ends are stable for the lifetime of the rendered subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedRange {
    pub first: NodeId,
    pub last: NodeId,
}

impl RenderedRange {
    pub fn single(node: NodeId) -> Self {
        Self {
            first: node,
            last: node,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// State scopes
// ═══════════════════════════════════════════════════════════════════════════

struct StateScopeInner {
    store: StateStore,
    actions: IndexMap<String, ActionDefinition>,
    local: bool,
    parent: Option<StateScope>,
}

/// Chain of stores visible to a subtree: the global store at the root, one link
/// per enclosing local-state instance.
#[derive(Clone)]
pub struct StateScope {
    inner: Rc<StateScopeInner>,
}

impl StateScope {
    pub fn global(store: StateStore, actions: &[ActionDefinition]) -> Self {
        Self::link(store, actions, false, None)
    }

    pub fn local(parent: &StateScope, store: StateStore, actions: &[ActionDefinition]) -> Self {
        Self::link(store, actions, true, Some(parent.clone()))
    }

    fn link(
        store: StateStore,
        actions: &[ActionDefinition],
        local: bool,
        parent: Option<StateScope>,
    ) -> Self {
        Self {
            inner: Rc::new(StateScopeInner {
                store,
                actions: actions
                    .iter()
                    .map(|action| (action.name.clone(), action.clone()))
                    .collect(),
                local,
                parent,
            }),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn is_local(&self) -> bool {
        self.inner.local
    }

    pub fn parent(&self) -> Option<&StateScope> {
        self.inner.parent.as_ref()
    }

    fn links(&self) -> impl Iterator<Item = &StateScope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// Store that owns `field`: the nearest one declaring it, else the global store.
    pub fn owner(&self, field: &str) -> &StateStore {
        let mut root = self;
        for scope in self.links() {
            if scope.inner.store.has(field) {
                return &scope.inner.store;
            }
            root = scope;
        }
        &root.inner.store
    }

    /// Nearest action named `name` and the scope that declares it.
    pub fn find_action(&self, name: &str) -> Option<(&StateScope, &ActionDefinition)> {
        self.links()
            .find_map(|scope| scope.inner.actions.get(name).map(|action| (scope, action)))
    }
}

impl StateSource for StateScope {
    fn read(&self, name: &str) -> Value {
        self.owner(name).get(name)
    }
}

impl fmt::Debug for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateScope")
            .field("store", &self.inner.store)
            .field("local", &self.inner.local)
            .field("depth", &self.links().count())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Render context
// ═══════════════════════════════════════════════════════════════════════════

/// Everything in force while rendering a subtree. Cheap to clone; derived
/// contexts share the tables and the ref registry.
#[derive(Clone)]
pub struct RenderContext {
    state: StateScope,
    locals: Locals,
    scope: ScopeId,
    tables: Rc<Tables>,
    refs: RefRegistry,
}

impl RenderContext {
    pub fn new(state: StateScope, tables: Rc<Tables>, scope: ScopeId) -> Self {
        Self {
            state,
            locals: Locals::new(),
            scope,
            tables,
            refs: RefRegistry::default(),
        }
    }

    pub fn state(&self) -> &StateScope {
        &self.state
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn refs(&self) -> &RefRegistry {
        &self.refs
    }

    pub fn with_scope(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn with_locals(&self, locals: Locals) -> Self {
        Self {
            locals,
            ..self.clone()
        }
    }

    pub fn with_state(&self, state: StateScope) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn eval_context(&self) -> EvalContext<'_> {
        EvalContext {
            state: &self.state,
            locals: self.locals.clone(),
            tables: &self.tables,
        }
    }

    pub fn evaluate(&self, expr: &Expression) -> Value {
        evaluate(expr, &self.eval_context())
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("state", &self.state)
            .field("locals", &self.locals)
            .field("scope", &self.scope)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Renderer
// ═══════════════════════════════════════════════════════════════════════════

/// Collaborators and settings of a renderer.
#[derive(Clone)]
pub struct RendererOptions {
    pub config: RenderConfig,
    pub diagnostics: Rc<dyn DiagnosticSink>,
    pub host: Rc<dyn ActionHost>,
    pub cookies: Rc<dyn CookieSource>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            config: RenderConfig::default(),
            diagnostics: Rc::new(LogSink),
            host: Rc::new(NoHost),
            cookies: Rc::new(NoCookies),
        }
    }
}

impl RendererOptions {
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Rc::new(sink);
        self
    }

    pub fn with_host(mut self, host: impl ActionHost + 'static) -> Self {
        self.host = Rc::new(host);
        self
    }

    pub fn with_cookies(mut self, cookies: impl CookieSource + 'static) -> Self {
        self.cookies = Rc::new(cookies);
        self
    }
}

struct RendererShared {
    document: Rc<RefCell<Document>>,
    scopes: RefCell<ScopeArena>,
    options: RendererOptions,
}

#[derive(Clone)]
pub struct Renderer {
    shared: Rc<RendererShared>,
}

/// Handle captured by bindings and event callbacks; it never keeps the renderer alive.
#[derive(Clone)]
pub(crate) struct WeakRenderer(Weak<RendererShared>);

impl WeakRenderer {
    pub(crate) fn upgrade(&self) -> Option<Renderer> {
        self.0.upgrade().map(|shared| Renderer { shared })
    }
}

impl Renderer {
    pub fn new(document: Rc<RefCell<Document>>, options: RendererOptions) -> Self {
        Self {
            shared: Rc::new(RendererShared {
                document,
                scopes: RefCell::new(ScopeArena::new()),
                options,
            }),
        }
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.shared.document
    }

    pub fn config(&self) -> &RenderConfig {
        &self.shared.options.config
    }

    pub(crate) fn options(&self) -> &RendererOptions {
        &self.shared.options
    }

    pub(crate) fn downgrade(&self) -> WeakRenderer {
        WeakRenderer(Rc::downgrade(&self.shared))
    }

    /// Root context for a program: global store, global actions, a fresh root scope.
    pub fn root_context(
        &self,
        store: StateStore,
        actions: &[ActionDefinition],
        tables: Tables,
    ) -> RenderContext {
        let scope = self.create_scope(None);
        RenderContext::new(StateScope::global(store, actions), Rc::new(tables), scope)
    }

    /// Renders `node` into `parent`, before `before` (appending when `None`).
    pub fn render(
        &self,
        node: &Node,
        ctx: &RenderContext,
        parent: NodeId,
        before: Option<NodeId>,
    ) -> RenderedRange {
        match node {
            Node::Element {
                tag,
                props,
                children,
                reference,
            } => element::render_element(
                self,
                ctx,
                element::ElementParts {
                    tag,
                    props,
                    children,
                    reference: reference.as_deref(),
                },
                parent,
                before,
            ),
            Node::Text { value } => element::render_text(self, ctx, value, parent, before),
            Node::If {
                condition,
                then,
                otherwise,
            } => conditional::render_if(
                self,
                ctx,
                conditional::Branches {
                    condition: condition.clone(),
                    then: then.clone(),
                    otherwise: otherwise.clone(),
                },
                parent,
                before,
            ),
            Node::Each {
                items,
                alias,
                index,
                key,
                body,
            } => each::render_each(
                self,
                ctx,
                each::EachTemplate {
                    items: items.clone(),
                    alias: alias.clone(),
                    index: index.clone(),
                    key: key.clone(),
                    body: body.clone(),
                },
                parent,
                before,
            ),
            Node::LocalState {
                state,
                actions,
                child,
            } => local_state::render_local_state(self, ctx, state, actions, child, parent, before),
            Node::Markdown { content } => leaf::render_markdown(self, ctx, content, parent, before),
            Node::Code { language, content } => {
                leaf::render_code(self, ctx, language, content, parent, before)
            }
            Node::Portal { target, children } => {
                leaf::render_portal(self, ctx, target, children, parent, before)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scopes
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_scope(&self, parent: Option<ScopeId>) -> ScopeId {
        self.shared.scopes.borrow_mut().create(parent)
    }

    /// Registers a cleanup on `scope`, running it right away if the scope is gone.
    pub fn add_cleanup(&self, scope: ScopeId, cleanup: Cleanup) {
        let rejected = self.shared.scopes.borrow_mut().add_cleanup(scope, cleanup);
        if let Some(cleanup) = rejected {
            cleanup.run();
        }
    }

    /// Runs every cleanup of `scope` and its descendants, children first.
    pub fn dispose(&self, scope: ScopeId) {
        let cleanups = self.shared.scopes.borrow_mut().take_for_disposal(scope);
        log::debug!("dispose {scope}: {} cleanup(s)", cleanups.len());
        for cleanup in cleanups {
            cleanup.run();
        }
    }

    pub fn live_scopes(&self) -> usize {
        self.shared.scopes.borrow().live_count()
    }

    /// Scope slots allocated so far, including free ones awaiting reuse.
    pub fn scope_capacity(&self) -> usize {
        self.shared.scopes.borrow().capacity()
    }

    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.shared
            .options
            .diagnostics
            .report(Diagnostic::new(kind, message));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Document helpers
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn insert(&self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        self.shared
            .document
            .borrow_mut()
            .insert_before(parent, node, before);
    }

    /// Top-level nodes of a range, in order.
    pub(crate) fn range_nodes(&self, range: RenderedRange) -> Vec<NodeId> {
        let doc = self.shared.document.borrow();
        let mut nodes = vec![range.first];
        let mut current = range.first;
        while current != range.last {
            match doc.next_sibling(current) {
                Some(next) => {
                    nodes.push(next);
                    current = next;
                }
                None => break,
            }
        }
        nodes
    }

    /// Node right after the range, if any.
    pub(crate) fn after(&self, range: RenderedRange) -> Option<NodeId> {
        self.shared.document.borrow().next_sibling(range.last)
    }

    pub(crate) fn move_range(&self, range: RenderedRange, parent: NodeId, before: Option<NodeId>) {
        let nodes = self.range_nodes(range);
        let mut doc = self.shared.document.borrow_mut();
        for node in nodes {
            doc.insert_before(parent, node, before);
        }
    }

    pub(crate) fn remove_range(&self, range: RenderedRange) {
        let nodes = self.range_nodes(range);
        let mut doc = self.shared.document.borrow_mut();
        for node in nodes {
            doc.remove(node);
        }
    }

    /// Removes every node strictly between two sibling markers.
    pub(crate) fn clear_between(&self, start: NodeId, end: NodeId) {
        let mut doc = self.shared.document.borrow_mut();
        while let Some(next) = doc.next_sibling(start) {
            if next == end {
                break;
            }
            doc.remove(next);
        }
    }

    pub(crate) fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.shared.document.borrow().parent(node)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.shared.options.config)
            .field("live_scopes", &self.live_scopes())
            .finish()
    }
}
