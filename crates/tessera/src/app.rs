//! Application facade: one program, one global store, one document, one renderer.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::diagnostics::DiagnosticSink;
use crate::dom::{Document, HtmlOptions, NodeId, inner_html};
use crate::eval::{RouteContext, Tables};
use crate::program::CompiledProgram;
use crate::render::{ActionHost, RenderContext, RenderedRange, Renderer, RendererOptions};
use crate::state::{CookieSource, StateStore};
use crate::value::Value;

#[derive(Clone, Default)]
pub struct AppOptions {
    pub renderer: RendererOptions,
    pub route: RouteContext,
}

impl AppOptions {
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.renderer = self.renderer.with_config(config);
        self
    }

    pub fn with_route(mut self, route: RouteContext) -> Self {
        self.route = route;
        self
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.renderer = self.renderer.with_diagnostics(sink);
        self
    }

    pub fn with_host(mut self, host: impl ActionHost + 'static) -> Self {
        self.renderer = self.renderer.with_host(host);
        self
    }

    pub fn with_cookies(mut self, cookies: impl CookieSource + 'static) -> Self {
        self.renderer = self.renderer.with_cookies(cookies);
        self
    }
}

struct Mounted {
    ctx: RenderContext,
    range: RenderedRange,
}

/// A mounted (or mountable) program.
///
/// ```
/// use std::sync::Arc;
/// use tessera::{App, AppOptions, CompiledProgram};
///
/// let program: CompiledProgram = r#"{
///     "state": { "name": { "type": "string", "initial": "world" } },
///     "view": { "kind": "element", "tag": "p", "children": [
///         { "kind": "text", "value": { "expr": "concat", "items": [
///             { "expr": "lit", "value": "hello " },
///             { "expr": "state", "name": "name" }
///         ] } }
///     ] }
/// }"#.parse().unwrap();
///
/// let mut app = App::new(Arc::new(program), AppOptions::default());
/// app.mount();
/// assert_eq!(app.to_html(), "<p>hello world</p>");
/// app.store().set("name", "there".into()).unwrap();
/// assert_eq!(app.to_html(), "<p>hello there</p>");
/// ```
pub struct App {
    program: Arc<CompiledProgram>,
    store: StateStore,
    renderer: Renderer,
    root: NodeId,
    route: RouteContext,
    mounted: Option<Mounted>,
}

impl App {
    pub fn new(program: Arc<CompiledProgram>, options: AppOptions) -> Self {
        let AppOptions { renderer, route } = options;
        let store = StateStore::from_declarations(&program.state, renderer.cookies.as_ref());
        let mut document = Document::new();
        let root = document.create_container(&renderer.config.root_id);
        let renderer = Renderer::new(Rc::new(RefCell::new(document)), renderer);
        Self {
            program,
            store,
            renderer,
            root,
            route,
            mounted: None,
        }
    }

    /// Renders the program's view into the root container. Mounting twice is a no-op.
    pub fn mount(&mut self) -> RenderedRange {
        if let Some(mounted) = &self.mounted {
            return mounted.range;
        }
        let tables = Tables::from_program(&self.program).with_route(self.route.clone());
        let ctx = self
            .renderer
            .root_context(self.store.clone(), &self.program.actions, tables);
        let range = self.renderer.render(&self.program.view, &ctx, self.root, None);
        log::debug!(
            "mounted {} view node(s) into #{}",
            self.program.view.count(),
            self.renderer.config().root_id
        );
        self.mounted = Some(Mounted { ctx, range });
        range
    }

    /// Disposes every scope (children first) and detaches the rendered nodes.
    pub fn unmount(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        self.renderer.dispose(mounted.ctx.scope());
        self.renderer.remove_range(mounted.range);
        log::debug!("unmounted; {} scope(s) still live", self.renderer.live_scopes());
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn program(&self) -> &Arc<CompiledProgram> {
        &self.program
    }

    /// The global store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Read access to the document. Drop the guard before dispatching events.
    pub fn document(&self) -> Ref<'_, Document> {
        self.renderer.document().borrow()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Registers an out-of-tree container portals can target. Call before `mount`.
    pub fn create_container(&self, name: &str) -> NodeId {
        self.renderer.document().borrow_mut().create_container(name)
    }

    /// Delivers `event` to the handlers attached to `node`. Returns how many ran.
    pub fn dispatch_event(&self, node: NodeId, event: &str, payload: &Value) -> usize {
        let listeners = self.renderer.document().borrow().listeners(node, event);
        log::trace!("dispatch `{event}` to {node:?}: {} listener(s)", listeners.len());
        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    /// Runs a program-level action by name, as an event handler would.
    pub fn run_action(&self, name: &str, payload: &Value) -> bool {
        match &self.mounted {
            Some(mounted) => {
                crate::render::run_named_action(&self.renderer, &mounted.ctx, name, payload)
            }
            None => false,
        }
    }

    /// Element registered under `name` through a `ref` prop.
    pub fn element_ref(&self, name: &str) -> Option<NodeId> {
        let mounted = self.mounted.as_ref()?;
        mounted.ctx.refs().borrow().get(name).copied()
    }

    /// Serialized content of the root container.
    pub fn to_html(&self) -> String {
        self.html_of(self.root)
    }

    /// Serialized content of a named container, e.g. a portal target.
    pub fn container_html(&self, name: &str) -> Option<String> {
        let container = self.document().container(name)?;
        Some(self.html_of(container))
    }

    fn html_of(&self, node: NodeId) -> String {
        let options = HtmlOptions {
            markers: self.renderer.config().markers,
        };
        inner_html(&self.document(), node, options)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// String mode: renders `program` once with its initial state and returns the HTML
/// of the root container.
pub fn render_to_string(program: Arc<CompiledProgram>, config: RenderConfig) -> String {
    let mut app = App::new(program, AppOptions::default().with_config(config));
    app.mount();
    app.to_html()
}
