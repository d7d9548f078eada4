//! `if` nodes.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use super::binding::watch;
use super::scope::ScopeId;
use super::{RenderContext, RenderedRange, Renderer};
use crate::dom::NodeId;
use crate::eval::dependencies;
use crate::program::{Expression, Node};

pub(super) struct Branches {
    pub condition: Arc<Expression>,
    pub then: Arc<Node>,
    pub otherwise: Option<Arc<Node>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    Then,
    Else,
}

struct Active {
    branch: Cell<Branch>,
    scope: Cell<Option<ScopeId>>,
}

/// Renders the selected branch between two comment markers. On a dependency change
/// the condition is re-evaluated; only a change of branch touches the document:
/// the old branch's scope is disposed, its nodes removed, the new branch rendered.
pub(super) fn render_if(
    renderer: &Renderer,
    ctx: &RenderContext,
    branches: Branches,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let (start, end) = {
        let mut doc = renderer.document().borrow_mut();
        let start = doc.create_comment("if");
        let end = doc.create_comment("/if");
        doc.insert_before(parent, start, before);
        doc.insert_before(parent, end, before);
        (start, end)
    };

    let branches = Rc::new(branches);
    let branch = select(ctx, &branches.condition);
    let active = Rc::new(Active {
        branch: Cell::new(branch),
        scope: Cell::new(render_branch(renderer, ctx, &branches, branch, end)),
    });

    let deps = dependencies(&branches.condition);
    if !deps.is_empty() {
        let weak = renderer.downgrade();
        let owner = ctx.clone();
        let state = active.clone();
        let on_change = move || {
            let Some(renderer) = weak.upgrade() else {
                return;
            };
            let next = select(&owner, &branches.condition);
            if next == state.branch.get() {
                return;
            }
            log::debug!("if in {}: switching to {next:?}", owner.scope());
            if let Some(old) = state.scope.take() {
                renderer.dispose(old);
            }
            renderer.clear_between(start, end);
            state.branch.set(next);
            state
                .scope
                .set(render_branch(&renderer, &owner, &branches, next, end));
        };
        watch(renderer, ctx, &deps, Rc::new(on_change));
    }

    RenderedRange {
        first: start,
        last: end,
    }
}

fn select(ctx: &RenderContext, condition: &Expression) -> Branch {
    if ctx.evaluate(condition).is_truthy() {
        Branch::Then
    } else {
        Branch::Else
    }
}

/// Renders `branch` before `end` in a fresh child scope. `None` when there is
/// nothing to render (a false condition without `else`).
fn render_branch(
    renderer: &Renderer,
    ctx: &RenderContext,
    branches: &Branches,
    branch: Branch,
    end: NodeId,
) -> Option<ScopeId> {
    let node = match branch {
        Branch::Then => &branches.then,
        Branch::Else => branches.otherwise.as_ref()?,
    };
    let parent = renderer.parent_of(end)?;
    let scope = renderer.create_scope(Some(ctx.scope()));
    renderer.render(node, &ctx.with_scope(scope), parent, Some(end));
    Some(scope)
}
