//! Named update operations.
//!
//! Every operation is a pure transform from the current field value to a new one.
//! Lists and objects are rebuilt, never edited in place, so snapshots previously
//! handed out stay unchanged.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::StateError;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOperation {
    Increment,
    Decrement,
    Push,
    Pop,
    Remove,
    Toggle,
    Merge,
    ReplaceAt,
    InsertAt,
    Splice,
}

impl UpdateOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOperation::Increment => "increment",
            UpdateOperation::Decrement => "decrement",
            UpdateOperation::Push => "push",
            UpdateOperation::Pop => "pop",
            UpdateOperation::Remove => "remove",
            UpdateOperation::Toggle => "toggle",
            UpdateOperation::Merge => "merge",
            UpdateOperation::ReplaceAt => "replaceAt",
            UpdateOperation::InsertAt => "insertAt",
            UpdateOperation::Splice => "splice",
        }
    }

    /// Computes the field's next value.
    pub fn apply(self, current: &Value, args: &UpdateArgs) -> Result<Value, StateError> {
        let op = self.as_str();
        match self {
            UpdateOperation::Increment | UpdateOperation::Decrement => {
                if matches!(current, Value::List(_) | Value::Object(_)) {
                    return Err(mismatch(op, current));
                }
                let step = args.value.as_ref().map_or(1.0, Value::to_number);
                let base = if current.is_nullish() {
                    0.0
                } else {
                    current.to_number()
                };
                Ok(Value::Number(if self == UpdateOperation::Increment {
                    base + step
                } else {
                    base - step
                }))
            }
            UpdateOperation::Toggle => Ok(Value::Bool(!current.is_truthy())),
            UpdateOperation::Merge => {
                let mut fields = match current {
                    Value::Object(fields) => (**fields).clone(),
                    v if v.is_nullish() => Default::default(),
                    other => return Err(mismatch(op, other)),
                };
                match &args.value {
                    Some(Value::Object(patch)) => {
                        for (k, v) in patch.iter() {
                            fields.insert(k.clone(), v.clone());
                        }
                    }
                    Some(other) => return Err(mismatch(op, other)),
                    None => {
                        return Err(StateError::MissingArgument {
                            operation: op,
                            argument: "value",
                        });
                    }
                }
                Ok(Value::Object(Arc::new(fields)))
            }
            UpdateOperation::Push => {
                let mut items = list_items(op, current)?;
                items.push(args.value.clone().unwrap_or_default());
                Ok(Value::List(Arc::new(items)))
            }
            UpdateOperation::Pop => {
                let mut items = list_items(op, current)?;
                items.pop();
                Ok(Value::List(Arc::new(items)))
            }
            UpdateOperation::Remove => {
                let mut items = list_items(op, current)?;
                if let Some(index) = args.index.as_ref() {
                    let index = args.index_arg(op, index)?;
                    if index >= items.len() {
                        return Err(StateError::IndexOutOfBounds {
                            operation: op,
                            index,
                            len: items.len(),
                        });
                    }
                    items.remove(index);
                } else if let Some(value) = args.value.as_ref() {
                    items.retain(|item| item != value);
                } else {
                    return Err(StateError::MissingArgument {
                        operation: op,
                        argument: "index",
                    });
                }
                Ok(Value::List(Arc::new(items)))
            }
            UpdateOperation::ReplaceAt => {
                let mut items = list_items(op, current)?;
                let index = args.required_index(op)?;
                let Some(slot) = items.get_mut(index) else {
                    return Err(StateError::IndexOutOfBounds {
                        operation: op,
                        index,
                        len: items.len(),
                    });
                };
                *slot = args.value.clone().unwrap_or_default();
                Ok(Value::List(Arc::new(items)))
            }
            UpdateOperation::InsertAt => {
                let mut items = list_items(op, current)?;
                let index = args.required_index(op)?.min(items.len());
                items.insert(index, args.value.clone().unwrap_or_default());
                Ok(Value::List(Arc::new(items)))
            }
            UpdateOperation::Splice => {
                let mut items = list_items(op, current)?;
                let start = args.required_index(op)?.min(items.len());
                let delete = match args.delete_count.as_ref() {
                    Some(count) => args.index_arg(op, count)?,
                    None => items.len() - start,
                }
                .min(items.len() - start);
                let inserted: Vec<Value> = match &args.value {
                    None | Some(Value::Undefined) => Vec::new(),
                    Some(Value::List(new_items)) => new_items.to_vec(),
                    Some(single) => vec![single.clone()],
                };
                items.splice(start..start + delete, inserted);
                Ok(Value::List(Arc::new(items)))
            }
        }
    }
}

impl FromStr for UpdateOperation {
    type Err = StateError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "increment" => UpdateOperation::Increment,
            "decrement" => UpdateOperation::Decrement,
            "push" => UpdateOperation::Push,
            "pop" => UpdateOperation::Pop,
            "remove" => UpdateOperation::Remove,
            "toggle" => UpdateOperation::Toggle,
            "merge" => UpdateOperation::Merge,
            "replaceAt" => UpdateOperation::ReplaceAt,
            "insertAt" => UpdateOperation::InsertAt,
            "splice" => UpdateOperation::Splice,
            other => return Err(StateError::UnknownOperation(other.to_string())),
        })
    }
}

impl fmt::Display for UpdateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Already-evaluated operation arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateArgs {
    pub value: Option<Value>,
    pub index: Option<Value>,
    pub delete_count: Option<Value>,
}

impl UpdateArgs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn at(index: usize) -> Self {
        Self {
            index: Some(Value::from(index)),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_delete_count(mut self, count: usize) -> Self {
        self.delete_count = Some(Value::from(count));
        self
    }

    fn required_index(&self, operation: &'static str) -> Result<usize, StateError> {
        match self.index.as_ref() {
            Some(index) => self.index_arg(operation, index),
            None => Err(StateError::MissingArgument {
                operation,
                argument: "index",
            }),
        }
    }

    fn index_arg(&self, operation: &'static str, value: &Value) -> Result<usize, StateError> {
        value.as_index().ok_or_else(|| mismatch(operation, value))
    }
}

fn list_items(operation: &'static str, current: &Value) -> Result<Vec<Value>, StateError> {
    match current {
        Value::List(items) => Ok(items.to_vec()),
        v if v.is_nullish() => Ok(Vec::new()),
        other => Err(mismatch(operation, other)),
    }
}

fn mismatch(operation: &'static str, found: &Value) -> StateError {
    StateError::TypeMismatch {
        operation,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[i32]) -> Value {
        Value::list(values.iter().map(|n| Value::from(*n)))
    }

    #[test]
    fn increment_defaults_to_one() {
        let next = UpdateOperation::Increment
            .apply(&Value::from(4), &UpdateArgs::none())
            .unwrap();
        assert_eq!(next, Value::from(5));
        let next = UpdateOperation::Decrement
            .apply(&Value::from(4), &UpdateArgs::value(3))
            .unwrap();
        assert_eq!(next, Value::from(1));
    }

    #[test]
    fn toggle_is_an_involution() {
        let once = UpdateOperation::Toggle
            .apply(&Value::Bool(true), &UpdateArgs::none())
            .unwrap();
        let twice = UpdateOperation::Toggle.apply(&once, &UpdateArgs::none()).unwrap();
        assert_eq!(once, Value::Bool(false));
        assert_eq!(twice, Value::Bool(true));
    }

    #[test]
    fn list_operations_rebuild_the_list() {
        let original = nums(&[1, 2, 3]);
        let pushed = UpdateOperation::Push
            .apply(&original, &UpdateArgs::value(4))
            .unwrap();
        assert_eq!(pushed, nums(&[1, 2, 3, 4]));
        assert_eq!(original, nums(&[1, 2, 3]));

        let removed = UpdateOperation::Remove
            .apply(&original, &UpdateArgs::at(0))
            .unwrap();
        assert_eq!(removed, nums(&[2, 3]));

        let by_value = UpdateOperation::Remove
            .apply(&original, &UpdateArgs::value(2))
            .unwrap();
        assert_eq!(by_value, nums(&[1, 3]));

        let inserted = UpdateOperation::InsertAt
            .apply(&original, &UpdateArgs::at(99).with_value(9))
            .unwrap();
        assert_eq!(inserted, nums(&[1, 2, 3, 9]));

        let spliced = UpdateOperation::Splice
            .apply(
                &original,
                &UpdateArgs::at(1).with_delete_count(1).with_value(nums(&[7, 8])),
            )
            .unwrap();
        assert_eq!(spliced, nums(&[1, 7, 8, 3]));
    }

    #[test]
    fn replace_at_rejects_out_of_bounds() {
        let err = UpdateOperation::ReplaceAt
            .apply(&nums(&[1]), &UpdateArgs::at(3).with_value(0))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::IndexOutOfBounds {
                operation: "replaceAt",
                index: 3,
                len: 1
            }
        );
    }

    #[test]
    fn merge_is_shallow() {
        let current = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
        let merged = UpdateOperation::Merge
            .apply(&current, &UpdateArgs::value(Value::object([("b", Value::from(3))])))
            .unwrap();
        assert_eq!(merged.get("a"), Value::from(1));
        assert_eq!(merged.get("b"), Value::from(3));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "explode".parse::<UpdateOperation>(),
            Err(StateError::UnknownOperation("explode".into()))
        );
        assert_eq!("replaceAt".parse(), Ok(UpdateOperation::ReplaceAt));
    }
}
