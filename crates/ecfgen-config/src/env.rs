//! Environment indirection for configuration values.
//!
//! A string value of the form `env.NAME` is replaced by the value of the
//! environment variable `NAME`:
//!
//! ```yaml
//! edits:
//!   ECF_HOME: env.HOME      # -> "/home/ops"
//!   COM: /lfs/h1/com        # unchanged
//! ```
//!
//! Unset variables are not an error. The literal `env.NAME` survives and a
//! warning is logged.

use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::warn;

/// Prefix marking a value as an environment lookup. Only a leading marker
/// counts: `env.HOME` is resolved, `my.env.HOME` is left alone.
pub const ENV_TOKEN: &str = "env.";

#[derive(Debug, Clone, Default)]
enum EnvSource {
    /// Read the live process environment on every lookup.
    #[default]
    Process,
    /// A frozen set of variables.
    Fixed(HashMap<String, String>),
}

/// Resolves `env.` indirections in configuration values.
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    token: String,
    source: EnvSource,
}

impl EnvironmentResolver {
    /// Create a resolver backed by the process environment.
    pub fn new() -> Self {
        Self {
            token: ENV_TOKEN.to_string(),
            source: EnvSource::Process,
        }
    }

    /// Create a resolver backed by a fixed set of variables.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self {
            token: ENV_TOKEN.to_string(),
            source: EnvSource::Fixed(vars),
        }
    }

    /// Use a different indirection prefix.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Add a variable, freezing the environment if it was live.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.source {
            EnvSource::Fixed(vars) => {
                vars.insert(key.into(), value.into());
            }
            EnvSource::Process => {
                let mut vars: HashMap<String, String> = std::env::vars().collect();
                vars.insert(key.into(), value.into());
                self.source = EnvSource::Fixed(vars);
            }
        }
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.source {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }

    /// Resolve a single string. The string must start with the token; the
    /// remainder is the variable name.
    pub fn resolve_str<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let Some(name) = value.strip_prefix(self.token.as_str()) else {
            return Cow::Borrowed(value);
        };
        match self.lookup(name) {
            Some(resolved) => Cow::Owned(resolved),
            None => {
                warn!("environment variable not found: [{}]", name);
                Cow::Borrowed(value)
            }
        }
    }

    /// Resolve a scalar value. Anything that is not a string, including
    /// null, is returned unchanged.
    pub fn resolve(&self, value: Value) -> Value {
        match value {
            Value::String(s) => {
                let resolved = match self.resolve_str(&s) {
                    Cow::Owned(resolved) => Some(resolved),
                    Cow::Borrowed(_) => None,
                };
                Value::String(resolved.unwrap_or(s))
            }
            other => other,
        }
    }

    /// Resolve every value of a mapping, descending into nested mappings
    /// and sequences. Keys are never rewritten.
    pub fn sub_env_values(&self, data: Value) -> Value {
        match data {
            Value::Mapping(mapping) => Value::Mapping(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, self.sub_env_values(value)))
                    .collect::<Mapping>(),
            ),
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.sub_env_values(item))
                    .collect(),
            ),
            other => self.resolve(other),
        }
    }
}

impl Default for EnvironmentResolver {
    fn default() -> Self {
        Self::new()
    }
}
