//! Component-local state instances.

use std::sync::Arc;

use indexmap::IndexMap;

use super::{RenderContext, RenderedRange, Renderer, StateScope};
use crate::dom::NodeId;
use crate::program::{ActionDefinition, FieldDecl, Node};
use crate::state::StateStore;

/// Renders `child` with a private store seeded from `fields` and a private action
/// table. Every call creates a new store, so two occurrences of the same node (or
/// two items of one list) never share state.
pub(super) fn render_local_state(
    renderer: &Renderer,
    ctx: &RenderContext,
    fields: &IndexMap<String, FieldDecl>,
    actions: &[ActionDefinition],
    child: &Arc<Node>,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let store = StateStore::from_declarations(fields, renderer.options().cookies.as_ref());
    let scope = renderer.create_scope(Some(ctx.scope()));
    log::debug!(
        "local state instance in {scope}: {} field(s), {} action(s)",
        fields.len(),
        actions.len()
    );
    let state = StateScope::local(ctx.state(), store, actions);
    let instance = ctx.with_state(state).with_scope(scope);
    renderer.render(child, &instance, parent, before)
}
