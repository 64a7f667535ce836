//! YAML configuration walking for ecfgen.
//!
//! This crate handles:
//! - Loading and merging configuration documents
//! - Environment indirection (`env.NAME` values)
//! - Classifying configuration keys as suites, families, tasks and
//!   attribute containers, and walking the resulting trees

pub mod attributes;
pub mod document;
pub mod env;
pub mod error;
pub mod node;

pub use attributes::{Edit, Trigger};
pub use document::ConfigDocument;
pub use env::{ENV_TOKEN, EnvironmentResolver};
pub use error::{ConfigError, ConfigResult};
pub use node::{ConfigNode, ConfigTree, KEYWORDS, NodeId, NodeKind};
