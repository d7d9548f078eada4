//! Renderer configuration.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How keyed list reconciliation repositions reused items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStrategy {
    /// Keep the longest run of items already in relative order, move the rest.
    #[default]
    Lis,
    /// Walk the new order backwards and re-insert every item that is not already
    /// directly before its successor.
    Reinsert,
}

impl FromStr for MoveStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lis" => Ok(MoveStrategy::Lis),
            "reinsert" => Ok(MoveStrategy::Reinsert),
            other => Err(format!(
                "unknown move strategy `{other}` (expected `lis` or `reinsert`)"
            )),
        }
    }
}

impl fmt::Display for MoveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoveStrategy::Lis => "lis",
            MoveStrategy::Reinsert => "reinsert",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub move_strategy: MoveStrategy,
    /// Keep comment markers in serialized output.
    pub markers: bool,
    /// Id of the container the app mounts into.
    pub root_id: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            move_strategy: MoveStrategy::default(),
            markers: false,
            root_id: "app".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_use_defaults() {
        let config: RenderConfig =
            serde_json::from_value(json!({"move_strategy": "reinsert"})).unwrap();
        assert_eq!(config.move_strategy, MoveStrategy::Reinsert);
        assert_eq!(config.root_id, "app");
        assert!(!config.markers);
    }
}
