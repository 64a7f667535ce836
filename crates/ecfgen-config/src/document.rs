//! Configuration documents.
//!
//! A document is either *flat*, with every top-level key naming a suite:
//!
//! ```yaml
//! prod00:
//!   edits: { ECF_HOME: env.ECF_HOME }
//!   tasks: { cleanup: }
//! ```
//!
//! or *sectioned*, with suites under `suites` and optional `externs`:
//!
//! ```yaml
//! externs:
//!   - /obsproc/v1.0/prod/dump
//! suites:
//!   prod00:
//!     tasks: { cleanup: }
//! ```

use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::attributes::scalar_text;
use crate::env::EnvironmentResolver;
use crate::node::ConfigTree;
use crate::{ConfigError, ConfigResult};

const SUITES_KEY: &str = "suites";
const EXTERNS_KEY: &str = "externs";

/// A parsed configuration, read-only after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
}

impl ConfigDocument {
    pub fn new(root: Mapping) -> Self {
        Self { root }
    }

    /// Wrap a parsed YAML value. An empty document is accepted; any other
    /// non-mapping root is rejected.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let root = match value {
            Value::Mapping(root) => root,
            Value::Null => Mapping::new(),
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "document root".to_string(),
                    message: format!("expected a mapping, found {}", describe(&other)),
                });
            }
        };

        match root.get(SUITES_KEY) {
            None | Some(Value::Mapping(_)) | Some(Value::Null) => {}
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: SUITES_KEY.to_string(),
                    message: format!("expected a mapping, found {}", describe(other)),
                });
            }
        }

        Ok(Self { root })
    }

    /// Load a document from a YAML file.
    pub fn from_yaml_file(path: &Path) -> ConfigResult<Self> {
        debug!("loading [{}]", path.display());
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Shallow merge: top-level keys of `other` replace those of `self`.
    pub fn merge(mut self, other: ConfigDocument) -> Self {
        for (key, value) in other.root {
            self.root.insert(key, value);
        }
        self
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Whether suites are held under a `suites` key.
    pub fn is_sectioned(&self) -> bool {
        self.root.contains_key(SUITES_KEY)
    }

    fn suite_section(&self) -> Option<&Mapping> {
        if self.is_sectioned() {
            self.root.get(SUITES_KEY).and_then(Value::as_mapping)
        } else {
            Some(&self.root)
        }
    }

    /// Suite names in document order.
    pub fn suite_names(&self) -> Vec<String> {
        self.suite_section()
            .map(|suites| suites.keys().filter_map(scalar_text).collect())
            .unwrap_or_default()
    }

    /// One tree per suite, resolving `env.` values from the process
    /// environment.
    pub fn suites(&self) -> Vec<ConfigTree> {
        self.suites_with(&EnvironmentResolver::new())
    }

    /// One tree per suite, in document order.
    pub fn suites_with(&self, resolver: &EnvironmentResolver) -> Vec<ConfigTree> {
        let Some(suites) = self.suite_section() else {
            return Vec::new();
        };
        suites
            .iter()
            .filter_map(|(key, data)| match scalar_text(key) {
                Some(name) => Some(ConfigTree::new(name, data.clone(), resolver)),
                None => {
                    warn!("skipping suite with non-scalar name {:?}", key);
                    None
                }
            })
            .collect()
    }

    /// Extern paths of a sectioned document.
    pub fn externs(&self) -> Vec<String> {
        if !self.is_sectioned() {
            return Vec::new();
        }
        match self.root.get(EXTERNS_KEY) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(other) => scalar_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigError;

    fn from_str(yaml: &str) -> ConfigResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
