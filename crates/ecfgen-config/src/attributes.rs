//! Attribute values read from configuration containers.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A variable attached to a suite, family or task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub name: String,
    pub value: String,
}

/// A trigger expression gating a node.
///
/// Entries of a `triggers` sequence may be written as:
///
/// ```yaml
/// triggers:
///   - "../prep == complete"          # verbatim expression
///   - expression: "fam1 eq complete" # verbatim expression
///   - task: jgfs_forecast            # -> "jgfs_forecast == complete"
///   - family: post
///     state: active                  # -> "post == active"
///   - task: jgfs_forecast
///     event: release_post000         # -> "jgfs_forecast:release_post000"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub expression: String,
}

const NODE_KEYS: [&str; 3] = ["task", "family", "node"];
const DEFAULT_STATE: &str = "complete";

impl Trigger {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    /// Parse one entry of a `triggers` sequence. Returns `None` for shapes
    /// that do not describe a trigger.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(expression) => Some(Self::new(expression.as_str())),
            Value::Mapping(entry) => {
                if let Some(expression) = entry.get("expression").and_then(scalar_text) {
                    return Some(Self::new(expression));
                }

                let node = NODE_KEYS
                    .iter()
                    .find_map(|key| entry.get(*key).and_then(scalar_text))?;

                if let Some(event) = entry.get("event").and_then(scalar_text) {
                    return Some(Self::new(format!("{}:{}", node, event)));
                }

                let state = entry
                    .get("state")
                    .and_then(scalar_text)
                    .unwrap_or_else(|| DEFAULT_STATE.to_string());
                Some(Self::new(format!("{} == {}", node, state)))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Text of a scalar value. Strings, numbers and booleans have text; null,
/// sequences, mappings and tagged values do not.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
