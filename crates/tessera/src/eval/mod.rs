//! Expression evaluation.
//!
//! [`evaluate`] is a pure function of an expression and an [`EvalContext`]. The
//! renderer uses [`dependencies`] to decide which state fields and locals a
//! binding has to follow.

mod context;
mod deps;
mod evaluator;
mod methods;
pub mod ops;
mod style;

pub use context::{EvalContext, LocalValue, Locals, RouteContext, StateSource, Tables};
pub use deps::{Dependencies, dependencies, dependencies_within};
pub use evaluator::evaluate;
pub use style::resolve_classes;
