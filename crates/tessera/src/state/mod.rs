//! Reactive state: the store, path updates and named update operations.

mod path;
mod store;
mod update;

use indexmap::IndexMap;

pub use path::{PathSegment, assign, lookup};
pub use store::{StateStore, Subscription};
pub use update::{UpdateArgs, UpdateOperation};

use crate::program::{FieldDecl, FieldType, InitialValue};
use crate::value::Value;

/// Host-side cookie lookup used to resolve deferred initial values.
pub trait CookieSource {
    fn cookie(&self, key: &str) -> Option<String>;
}

/// Cookie source for hosts without cookies; every placeholder uses its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCookies;

impl CookieSource for NoCookies {
    fn cookie(&self, _key: &str) -> Option<String> {
        None
    }
}

impl CookieSource for IndexMap<String, String> {
    fn cookie(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl StateStore {
    /// Builds a store from field declarations, resolving cookie placeholders once.
    pub fn from_declarations(
        fields: &IndexMap<String, FieldDecl>,
        cookies: &dyn CookieSource,
    ) -> Self {
        StateStore::with_fields(fields.iter().map(|(name, decl)| {
            let value = match &decl.initial {
                InitialValue::Value(value) => value.clone(),
                InitialValue::Cookie(placeholder) => cookies
                    .cookie(&placeholder.key)
                    .and_then(|raw| parse_cookie(decl.ty, &raw))
                    .unwrap_or_else(|| placeholder.default.clone()),
            };
            (name.as_str(), value)
        }))
    }
}

/// Interprets a raw cookie string as a value of the declared type. `None` means the
/// cookie does not fit the type and the default should be used.
fn parse_cookie(ty: FieldType, raw: &str) -> Option<Value> {
    match ty {
        FieldType::String => Some(Value::string(raw)),
        FieldType::Number => raw.trim().parse::<f64>().ok().map(Value::Number),
        FieldType::Boolean => match raw.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::List | FieldType::Object => {
            let value = Value::from(serde_json::from_str::<serde_json::Value>(raw).ok()?);
            let fits = match ty {
                FieldType::List => value.as_list().is_some(),
                _ => value.as_object().is_some(),
            };
            fits.then_some(value)
        }
    }
}
