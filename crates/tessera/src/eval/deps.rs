//! Static dependency collection for bindings.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::program::Expression;

/// Names an expression may read: state fields and free local variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub state: SmallVec<[Arc<str>; 4]>,
    pub locals: SmallVec<[Arc<str>; 4]>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.locals.is_empty()
    }

    /// Adds the names of `other` that are not already present.
    pub fn merge(&mut self, other: &Dependencies) {
        for name in &other.state {
            self.add_state(name);
        }
        for name in &other.locals {
            self.add_local(name);
        }
    }

    fn add_state(&mut self, name: &Arc<str>) {
        if !self.state.contains(name) {
            self.state.push(name.clone());
        }
    }

    fn add_local(&mut self, name: &Arc<str>) {
        if !self.locals.contains(name) {
            self.locals.push(name.clone());
        }
    }
}

/// Collects every state field and free local an expression reads, in first-read
/// order. Both branches of conditionals count; lambda parameters shadow locals of
/// the same name inside the lambda body.
pub fn dependencies(expr: &Expression) -> Dependencies {
    dependencies_within(expr, &[])
}

/// Like [`dependencies`] for an expression evaluated with `params` already bound,
/// such as a list key expression evaluated per item.
pub fn dependencies_within(expr: &Expression, params: &[Arc<str>]) -> Dependencies {
    let mut deps = Dependencies::default();
    let mut bound = params.to_vec();
    collect(expr, &mut bound, &mut deps);
    deps
}

fn collect(expr: &Expression, bound: &mut Vec<Arc<str>>, deps: &mut Dependencies) {
    match expr {
        Expression::Literal { .. }
        | Expression::Route { .. }
        | Expression::Data { .. }
        | Expression::Import { .. } => {}
        Expression::State { name, .. } => deps.add_state(name),
        Expression::Local { name, .. } => {
            if !bound.contains(name) {
                deps.add_local(name);
            }
        }
        Expression::Binary { left, right, .. } => {
            collect(left, bound, deps);
            collect(right, bound, deps);
        }
        Expression::Not { operand } => collect(operand, bound, deps),
        Expression::Conditional {
            condition,
            then,
            otherwise,
        } => {
            collect(condition, bound, deps);
            collect(then, bound, deps);
            collect(otherwise, bound, deps);
        }
        Expression::Get { base, .. } => collect(base, bound, deps),
        Expression::Index { base, key } => {
            collect(base, bound, deps);
            collect(key, bound, deps);
        }
        Expression::Concat { items: exprs } | Expression::Array { elements: exprs } => {
            for expr in exprs {
                collect(expr, bound, deps);
            }
        }
        Expression::Lambda { param, index, body } => {
            let depth = bound.len();
            bound.push(param.clone());
            bound.extend(index.iter().cloned());
            collect(body, bound, deps);
            bound.truncate(depth);
        }
        Expression::Call { target, args, .. } => {
            collect(target, bound, deps);
            for arg in args {
                collect(arg, bound, deps);
            }
        }
        Expression::Style { variants, .. } => {
            for expr in variants.values() {
                collect(expr, bound, deps);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lambda_parameters_shadow_locals() {
        let expr: Expression = serde_json::from_value(json!({
            "expr": "call",
            "target": {"expr": "state", "name": "todos"},
            "method": "filter",
            "args": [{
                "expr": "lambda", "param": "todo",
                "body": {
                    "expr": "bin", "op": "==",
                    "left": {"expr": "var", "name": "todo", "path": "owner"},
                    "right": {"expr": "var", "name": "user"}
                }
            }]
        }))
        .unwrap();
        let deps = dependencies(&expr);
        assert_eq!(deps.state.as_slice(), [Arc::<str>::from("todos")]);
        assert_eq!(deps.locals.as_slice(), [Arc::<str>::from("user")]);
    }

    #[test]
    fn both_conditional_branches_are_dependencies() {
        let expr: Expression = serde_json::from_value(json!({
            "expr": "cond",
            "if": {"expr": "state", "name": "on"},
            "then": {"expr": "state", "name": "a"},
            "else": {"expr": "state", "name": "on"}
        }))
        .unwrap();
        let deps = dependencies(&expr);
        let names: Vec<&str> = deps.state.iter().map(|n| &**n).collect();
        assert_eq!(names, ["on", "a"]);
    }
}
