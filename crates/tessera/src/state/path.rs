//! Structural copy-on-write updates addressed by a path.

use std::fmt;
use std::sync::Arc;

use crate::error::StateError;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(Arc<str>),
    Index(usize),
}

impl PathSegment {
    /// Splits `"items.0.title"` into segments; purely numeric segments become indices.
    pub fn parse_dotted(path: &str) -> Vec<PathSegment> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(segment.into()),
            })
            .collect()
    }

    /// Reads a path produced by an expression: a dotted string or a list of
    /// keys/indices.
    pub fn from_value(value: &Value) -> Vec<PathSegment> {
        match value {
            Value::String(path) => Self::parse_dotted(path),
            Value::Number(_) => value.as_index().map(PathSegment::Index).into_iter().collect(),
            Value::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Number(_) => item.as_index().map(PathSegment::Index),
                    Value::String(key) => Some(PathSegment::Key(key.clone())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Returns `current` with the value at `path` replaced by `value`.
///
/// Only the containers along the path are rebuilt; every sibling keeps its
/// existing `Arc`. Missing intermediate containers are created (objects for keys,
/// lists for indices). An index may address an existing item or append one right
/// after the last; anything further is rejected.
pub fn assign(current: &Value, path: &[PathSegment], value: Value) -> Result<Value, StateError> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(value);
    };
    match (head, current) {
        (PathSegment::Index(index), Value::Object(_)) => {
            let mut keyed = Vec::with_capacity(path.len());
            keyed.push(PathSegment::Key(index.to_string().into()));
            keyed.extend_from_slice(rest);
            assign(current, &keyed, value)
        }
        (PathSegment::Index(index), _) => {
            let mut items = current.as_list().map(<[Value]>::to_vec).unwrap_or_default();
            let len = items.len();
            match items.get_mut(*index) {
                Some(slot) => *slot = assign(slot, rest, value)?,
                None if *index == len => items.push(assign(&Value::Undefined, rest, value)?),
                None => {
                    return Err(StateError::IndexOutOfBounds {
                        operation: "setPath",
                        index: *index,
                        len,
                    });
                }
            }
            Ok(Value::List(Arc::new(items)))
        }
        (PathSegment::Key(key), _) => {
            let mut fields = current.as_object().cloned().unwrap_or_default();
            let child = fields.get(key).cloned().unwrap_or_default();
            fields.insert(key.clone(), assign(&child, rest, value)?);
            Ok(Value::Object(Arc::new(fields)))
        }
    }
}

/// Reads the value at `path`, `undefined` when any segment is missing.
pub fn lookup(current: &Value, path: &[PathSegment]) -> Value {
    path.iter().fold(current.clone(), |value, segment| match segment {
        PathSegment::Key(key) => value.get(key),
        PathSegment::Index(index) => match &value {
            Value::List(items) => items.get(*index).cloned().unwrap_or_default(),
            other => other.get(&index.to_string()),
        },
    })
}
