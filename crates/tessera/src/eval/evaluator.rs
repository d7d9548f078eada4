//! The expression interpreter.

use indexmap::IndexMap;

use super::context::EvalContext;
use super::{methods, ops, style};
use crate::program::{BinaryOp, Expression, RouteSource};
use crate::value::Value;

/// Evaluates an expression. Total: misses and type mismatches resolve to
/// `undefined`, nothing here returns an error. Panics raised by host code reached
/// through the context propagate unchanged.
pub fn evaluate(expr: &Expression, ctx: &EvalContext<'_>) -> Value {
    match expr {
        Expression::Literal { value } => value.clone(),
        Expression::State { name, path } => with_path(ctx.state.read(name), path.as_deref()),
        Expression::Local { name, path } => with_path(ctx.locals.get(name), path.as_deref()),
        Expression::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let left = evaluate(left, ctx);
                if left.is_truthy() {
                    evaluate(right, ctx)
                } else {
                    left
                }
            }
            BinaryOp::Or => {
                let left = evaluate(left, ctx);
                if left.is_truthy() {
                    left
                } else {
                    evaluate(right, ctx)
                }
            }
            op => ops::binary(*op, &evaluate(left, ctx), &evaluate(right, ctx)),
        },
        Expression::Not { operand } => Value::Bool(!evaluate(operand, ctx).is_truthy()),
        Expression::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, ctx).is_truthy() {
                evaluate(then, ctx)
            } else {
                evaluate(otherwise, ctx)
            }
        }
        Expression::Get { base, path } => evaluate(base, ctx).get_path(path),
        Expression::Index { base, key } => ops::index(&evaluate(base, ctx), &evaluate(key, ctx)),
        Expression::Concat { items } => {
            let text: String = items.iter().map(|item| evaluate(item, ctx).to_text()).collect();
            Value::string(text)
        }
        Expression::Array { elements } => {
            Value::list(elements.iter().map(|element| evaluate(element, ctx)))
        }
        Expression::Lambda { .. } => {
            log::debug!("lambda evaluated outside a call argument");
            Value::Undefined
        }
        Expression::Call {
            target,
            method,
            args,
        } => methods::call(&evaluate(target, ctx), method, args, ctx),
        Expression::Style { name, variants } => {
            let Some(preset) = ctx.tables.styles.get(name) else {
                return Value::string("");
            };
            let selection: IndexMap<String, String> = variants
                .iter()
                .filter_map(|(variant, expr)| {
                    let value = evaluate(expr, ctx);
                    (!value.is_nullish()).then(|| (variant.clone(), value.to_text()))
                })
                .collect();
            Value::string(style::resolve_classes(preset, &selection))
        }
        Expression::Route { name, source } => {
            let route = &ctx.tables.route;
            let found = match source {
                RouteSource::Param => route.params.get(name),
                RouteSource::Query => route.query.get(name),
                RouteSource::Path => Some(&route.path),
            };
            found.map_or(Value::Undefined, |text| Value::string(text.as_str()))
        }
        Expression::Data { name, path } => with_path(
            ctx.tables.data.get(name).cloned().unwrap_or_default(),
            path.as_deref(),
        ),
        Expression::Import { name, path } => with_path(
            ctx.tables.imports.get(name).cloned().unwrap_or_default(),
            path.as_deref(),
        ),
    }
}

fn with_path(value: Value, path: Option<&str>) -> Value {
    match path {
        Some(path) => value.get_path(path),
        None => value,
    }
}
