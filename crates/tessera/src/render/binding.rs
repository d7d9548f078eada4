//! Bindings: subscriptions that re-run a piece of rendering when the state an
//! expression reads changes.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::scope::Cleanup;
use super::{RenderContext, Renderer};
use crate::eval::{Dependencies, LocalValue, dependencies};
use crate::program::Expression;
use crate::value::Value;

/// Subscribes `on_change` to every store field `deps` can reach from `ctx`: state
/// fields through the owning store, reactive locals through their item cell. The
/// subscriptions are owned by the context's scope.
pub(super) fn watch(
    renderer: &Renderer,
    ctx: &RenderContext,
    deps: &Dependencies,
    on_change: Rc<dyn Fn()>,
) {
    for name in &deps.state {
        let callback = on_change.clone();
        let subscription = ctx
            .state()
            .owner(name)
            .subscribe(name, move |_: &Value| callback());
        renderer.add_cleanup(ctx.scope(), Cleanup::Unsubscribe(subscription));
    }
    for name in &deps.locals {
        if let Some(LocalValue::Reactive { store, field }) = ctx.locals().binding(name) {
            let callback = on_change.clone();
            let subscription = store.subscribe(field, move |_: &Value| callback());
            renderer.add_cleanup(ctx.scope(), Cleanup::Unsubscribe(subscription));
        }
    }
}

/// Evaluates `expr`, hands the value to `write`, and calls `write` again whenever
/// the value changes. Literal and dependency-free expressions are written once.
pub(super) fn bind(
    renderer: &Renderer,
    ctx: &RenderContext,
    expr: Arc<Expression>,
    write: impl Fn(&Value) + 'static,
) {
    let initial = ctx.evaluate(&expr);
    write(&initial);
    let deps = dependencies(&expr);
    if deps.is_empty() {
        return;
    }

    let last = RefCell::new(initial);
    let eval_ctx = ctx.clone();
    let on_change = move || {
        let next = eval_ctx.evaluate(&expr);
        if last.borrow().same(&next) {
            return;
        }
        log::trace!("binding in {} changed to {next:?}", eval_ctx.scope());
        *last.borrow_mut() = next.clone();
        write(&next);
    };
    watch(renderer, ctx, &deps, Rc::new(on_change));
}
