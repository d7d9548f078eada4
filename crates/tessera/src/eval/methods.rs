//! Method calls: higher-order list methods taking one lambda, plus a handful of
//! plain list and string helpers. Everything is fail-soft: a wrong receiver type,
//! a missing lambda or an unknown method yields `undefined`.

use std::sync::Arc;

use super::context::{EvalContext, LocalValue};
use super::evaluator::evaluate;
use super::ops;
use crate::program::Expression;
use crate::value::Value;

pub fn call(target: &Value, method: &str, args: &[Expression], ctx: &EvalContext<'_>) -> Value {
    match method {
        "filter" | "map" | "find" | "findIndex" | "some" | "every" => {
            higher_order(target, method, args, ctx)
        }
        _ => {
            let args: Vec<Value> = args.iter().map(|arg| evaluate(arg, ctx)).collect();
            plain(target, method, &args)
        }
    }
}

fn higher_order(target: &Value, method: &str, args: &[Expression], ctx: &EvalContext<'_>) -> Value {
    let Some(items) = target.as_list() else {
        return Value::Undefined;
    };
    let [
        Expression::Lambda {
            param, index, body, ..
        },
    ] = args
    else {
        log::debug!("`{method}` expects exactly one lambda argument");
        return Value::Undefined;
    };
    let lambda = Lambda {
        param,
        index: index.as_ref(),
        body: &**body,
        ctx,
    };

    match method {
        "filter" => Value::list(
            items
                .iter()
                .enumerate()
                .filter(|(i, item)| lambda.apply(item, *i).is_truthy())
                .map(|(_, item)| item.clone()),
        ),
        "map" => Value::list(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| lambda.apply(item, i)),
        ),
        "find" => items
            .iter()
            .enumerate()
            .find(|(i, item)| lambda.apply(item, *i).is_truthy())
            .map_or(Value::Undefined, |(_, item)| item.clone()),
        "findIndex" => Value::Number(
            items
                .iter()
                .enumerate()
                .position(|(i, item)| lambda.apply(item, i).is_truthy())
                .map_or(-1.0, |i| i as f64),
        ),
        "some" => Value::Bool(
            items
                .iter()
                .enumerate()
                .any(|(i, item)| lambda.apply(item, i).is_truthy()),
        ),
        "every" => Value::Bool(
            items
                .iter()
                .enumerate()
                .all(|(i, item)| lambda.apply(item, i).is_truthy()),
        ),
        _ => Value::Undefined,
    }
}

struct Lambda<'e, 'c> {
    param: &'e Arc<str>,
    index: Option<&'e Arc<str>>,
    body: &'e Expression,
    ctx: &'e EvalContext<'c>,
}

impl Lambda<'_, '_> {
    /// Evaluates the body in a fresh frame on top of the call-site locals.
    fn apply(&self, item: &Value, position: usize) -> Value {
        let mut bindings = vec![(self.param.clone(), LocalValue::Value(item.clone()))];
        if let Some(index) = self.index {
            bindings.push((index.clone(), LocalValue::Value(Value::from(position))));
        }
        let child = self.ctx.with_locals(self.ctx.locals.extend(bindings));
        evaluate(self.body, &child)
    }
}

fn plain(target: &Value, method: &str, args: &[Value]) -> Value {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    match (target, method) {
        (Value::List(items), "length") => Value::from(items.len()),
        (Value::String(text), "length") => Value::from(text.chars().count()),

        (Value::List(items), "includes") => {
            let needle = arg(0);
            Value::Bool(items.iter().any(|item| ops::equals(item, &needle)))
        }
        (Value::String(text), "includes") => Value::Bool(text.contains(arg(0).to_text().as_str())),
        (Value::List(items), "indexOf") => {
            let needle = arg(0);
            Value::Number(
                items
                    .iter()
                    .position(|item| ops::equals(item, &needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        (Value::List(items), "join") => {
            let separator = match arg(0) {
                v if v.is_nullish() => ",".to_string(),
                v => v.to_text(),
            };
            Value::string(
                items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(&separator),
            )
        }
        (Value::List(items), "slice") => {
            let (start, end) = slice_bounds(items.len(), &arg(0), &arg(1));
            Value::list(items[start..end].iter().cloned())
        }
        (Value::String(text), "slice") => {
            let chars: Vec<char> = text.chars().collect();
            let (start, end) = slice_bounds(chars.len(), &arg(0), &arg(1));
            Value::string(chars[start..end].iter().collect::<String>())
        }
        (Value::List(items), "at") => {
            let Some(position) = relative_index(items.len(), &arg(0)) else {
                return Value::Undefined;
            };
            items.get(position).cloned().unwrap_or_default()
        }

        (Value::String(text), "toUpperCase") => Value::string(text.to_uppercase()),
        (Value::String(text), "toLowerCase") => Value::string(text.to_lowercase()),
        (Value::String(text), "trim") => Value::string(text.trim()),
        (Value::String(text), "startsWith") => {
            Value::Bool(text.starts_with(arg(0).to_text().as_str()))
        }
        (Value::String(text), "endsWith") => Value::Bool(text.ends_with(arg(0).to_text().as_str())),

        _ => Value::Undefined,
    }
}

/// Resolves a possibly negative index against `len`. `None` when out of range.
fn relative_index(len: usize, index: &Value) -> Option<usize> {
    let n = index.to_number();
    if n.is_nan() {
        return if index.is_undefined() { Some(0) } else { None };
    }
    let n = n.trunc();
    let resolved = if n < 0.0 { len as f64 + n } else { n };
    (resolved >= 0.0 && resolved < len as f64).then_some(resolved as usize)
}

/// `slice(start, end)` bounds: negatives count from the end, everything clamps.
fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let clamp = |value: &Value, default: usize| -> usize {
        if value.is_nullish() {
            return default;
        }
        let n = value.to_number();
        if n.is_nan() {
            return 0;
        }
        let n = n.trunc();
        let resolved = if n < 0.0 { len as f64 + n } else { n };
        resolved.clamp(0.0, len as f64) as usize
    };
    let start = clamp(start, 0);
    let end = clamp(end, len);
    (start, end.max(start))
}
