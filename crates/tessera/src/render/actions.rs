//! Action execution.
//!
//! Actions are message passing into the stores: each state step evaluates its
//! arguments and calls `set`, `update` or `set_path` on the store that owns the
//! target field. Steps this crate does not interpret go to the [`ActionHost`].

use super::{RenderContext, Renderer, StateScope};
use crate::diagnostics::DiagnosticKind;
use crate::eval::evaluate;
use crate::program::{ActionDefinition, ActionStep, EventHandler};
use crate::state::{PathSegment, UpdateArgs};
use crate::value::Value;

/// An external step handed to the host.
#[derive(Debug, Clone, Copy)]
pub struct ExternalStep<'a> {
    /// Name of the action the step belongs to.
    pub action: &'a str,
    /// Step kind, e.g. `fetch` or `navigate`.
    pub kind: &'a str,
    /// The step's fields, without `do`.
    pub body: &'a serde_json::Value,
    pub payload: &'a Value,
}

/// Executes steps outside the state subset (network, navigation, storage...).
pub trait ActionHost {
    /// Returns `false` when the host does not handle `step.kind`.
    fn run_external(&self, step: &ExternalStep<'_>) -> bool;
}

/// Host that handles nothing; every external step becomes a diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl ActionHost for NoHost {
    fn run_external(&self, _step: &ExternalStep<'_>) -> bool {
        false
    }
}

/// Runs an event handler: evaluates its payload with `event` bound, then runs the
/// named action.
pub(super) fn handle_event(
    renderer: &Renderer,
    ctx: &RenderContext,
    handler: &EventHandler,
    event: &Value,
) {
    let payload = match &handler.payload {
        Some(expr) => evaluate(
            expr,
            &ctx.eval_context()
                .with_locals(ctx.locals().bind("event", event.clone())),
        ),
        None => event.clone(),
    };
    run_named_action(renderer, ctx, &handler.action, &payload);
}

/// Looks `name` up in the nearest local-state instance first, then outwards to the
/// program's actions. Returns `false` (after a diagnostic) when nothing matches.
pub(crate) fn run_named_action(
    renderer: &Renderer,
    ctx: &RenderContext,
    name: &str,
    payload: &Value,
) -> bool {
    let Some((owner, action)) = ctx.state().find_action(name) else {
        renderer.report(
            DiagnosticKind::UnknownAction,
            format!("no action named `{name}`"),
        );
        return false;
    };
    log::debug!("run action `{name}` ({} step(s))", action.steps.len());
    run_action(renderer, ctx, owner, action, payload);
    true
}

fn run_action(
    renderer: &Renderer,
    ctx: &RenderContext,
    owner: &StateScope,
    action: &ActionDefinition,
    payload: &Value,
) {
    let eval = ctx
        .eval_context()
        .with_locals(ctx.locals().bind("payload", payload.clone()));
    for step in &action.steps {
        if owner.is_local() && !step.is_state_step() {
            renderer.report(
                DiagnosticKind::UnsupportedLocalStep,
                format!(
                    "local action `{}` cannot run a `{}` step; skipped",
                    action.name,
                    step.kind()
                ),
            );
            continue;
        }
        let result = match step {
            ActionStep::Set { target, value } => {
                owner.owner(target).set(target, evaluate(value, &eval))
            }
            ActionStep::Update {
                target,
                operation,
                value,
                index,
                delete_count,
            } => {
                let args = UpdateArgs {
                    value: value.as_ref().map(|expr| evaluate(expr, &eval)),
                    index: index.as_ref().map(|expr| evaluate(expr, &eval)),
                    delete_count: delete_count.as_ref().map(|expr| evaluate(expr, &eval)),
                };
                owner.owner(target).update_named(target, operation, &args)
            }
            ActionStep::SetPath {
                target,
                path,
                value,
            } => {
                let path = PathSegment::from_value(&evaluate(path, &eval));
                owner
                    .owner(target)
                    .set_path(target, &path, evaluate(value, &eval))
            }
            ActionStep::External { kind, body } => {
                let step = ExternalStep {
                    action: &action.name,
                    kind,
                    body,
                    payload,
                };
                if !renderer.options().host.run_external(&step) {
                    renderer.report(
                        DiagnosticKind::UnhandledStep,
                        format!("`{kind}` step of action `{}` was not handled", action.name),
                    );
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            renderer.report(
                DiagnosticKind::RejectedUpdate,
                format!("action `{}`: {err}", action.name),
            );
        }
    }
}
