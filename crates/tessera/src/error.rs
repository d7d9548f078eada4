//! Error types for fallible construction and state mutation.

use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced while loading or preparing a program.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid compiled program: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Rejected state mutations. A rejected call leaves the field untouched and
/// notifies nobody.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("unknown state field `{0}`")]
    UnknownField(Arc<str>),
    #[error("unknown update operation `{0}`")]
    UnknownOperation(String),
    #[error("`{operation}` cannot be applied to a {found} value")]
    TypeMismatch {
        operation: &'static str,
        found: &'static str,
    },
    #[error("`{operation}` index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds {
        operation: &'static str,
        index: usize,
        len: usize,
    },
    #[error("`{operation}` requires a `{argument}` argument")]
    MissingArgument {
        operation: &'static str,
        argument: &'static str,
    },
}
