//! Dynamic value model shared by the evaluator, the state store and the renderer.
//!
//! Aggregates are `Arc`-wrapped so cloning a value is O(1) and copy-on-write
//! updates can share untouched siblings with the previous snapshot.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field map of an object value. Insertion order is preserved.
pub type ObjectMap = IndexMap<Arc<str>, Value>;

/// A runtime value.
///
/// Values handed out by the store are snapshots: nothing in this crate mutates a
/// value reachable from an existing `Value`, every update builds a new one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// Missing value: unbound variable, absent field, failed lookup.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    List(Arc<Vec<Value>>),
    Object(Arc<ObjectMap>),
}

impl Value {
    pub fn number(n: impl Into<f64>) -> Self {
        Value::Number(n.into())
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn object(fields: impl IntoIterator<Item = (impl Into<Arc<str>>, Value)>) -> Self {
        Value::Object(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Interprets the value as a list index. Only finite, non-negative integers qualify.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => {
                Some(*n as usize)
            }
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Truthiness with the usual scripting rules: `undefined`, `null`, `false`, `0`,
    /// `NaN` and `""` are falsy, everything else (including empty lists) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Object(_) => true,
        }
    }

    /// Numeric coercion.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::List(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) => f64::NAN,
        }
    }

    /// Text used for DOM output and concatenation. `null`/`undefined` render empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Property lookup on a single segment. Never fails: misses are `undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(fields) => fields.get(key).cloned().unwrap_or_default(),
            Value::List(items) => {
                if key == "length" {
                    return Value::Number(items.len() as f64);
                }
                key.parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default()
            }
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }

    /// Dotted path traversal (`"user.address.city"`, `"items.0.title"`).
    pub fn get_path(&self, path: &str) -> Value {
        if path.is_empty() {
            return self.clone();
        }
        let mut current = self.clone();
        for segment in path.split('.') {
            if current.is_nullish() {
                return Value::Undefined;
            }
            current = current.get(segment);
        }
        current
    }

    /// Equality with an `Arc::ptr_eq` fast path for aggregates.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) if Arc::ptr_eq(a, b) => true,
            (Value::Object(a), Value::Object(b)) if Arc::ptr_eq(a, b) => true,
            _ => self == other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

/// Formats a number the way scripting runtimes print them: integral values without
/// a fractional part, `NaN`, `Infinity`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::List(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(fields) => Value::Object(Arc::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k), Value::from(v)))
                    .collect(),
            )),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().cloned().map(Into::into).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone().into()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_scripting_rules() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::number(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::list([]).is_truthy());
        assert!(Value::string("0").is_truthy());
    }

    #[test]
    fn path_traversal_is_null_safe() {
        let user = Value::from(json!({"profile": {"tags": ["a", "b"]}, "missing": null}));
        assert_eq!(user.get_path("profile.tags.1"), Value::string("b"));
        assert_eq!(user.get_path("profile.tags.length"), Value::number(2));
        assert_eq!(user.get_path("missing.deeper.still"), Value::Undefined);
        assert_eq!(user.get_path("nope.x"), Value::Undefined);
        assert_eq!(Value::Undefined.get_path("a"), Value::Undefined);
    }

    #[test]
    fn numbers_print_without_trailing_fraction() {
        assert_eq!(Value::number(3).to_text(), "3");
        assert_eq!(Value::number(2.5).to_text(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_text(), "NaN");
        assert_eq!(Value::Null.to_text(), "");
    }

    #[test]
    fn coercion_to_number() {
        assert_eq!(Value::string(" 42 ").to_number(), 42.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::string("abc").to_number().is_nan());
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn json_conversion_preserves_field_order() {
        let value = Value::from(json!({"b": 1, "a": 2}));
        let keys: Vec<_> = value.as_object().unwrap().keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(serde_json::Value::from(value), json!({"b": 1.0, "a": 2.0}));
    }
}
