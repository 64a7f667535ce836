//! Definition build errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "suite {suite}: trigger already defined on {path}: [{existing}] -> [{attempted}]"
    )]
    TriggerConflict {
        suite: String,
        path: String,
        existing: String,
        attempted: String,
    },

    #[error("suite {suite}: definition rejected at {path}: {source}")]
    Definition {
        suite: String,
        path: String,
        #[source]
        source: ecfgen_core::Error,
    },

    #[error("extern {path}: {source}")]
    Extern {
        path: String,
        #[source]
        source: ecfgen_core::Error,
    },
}

impl BuildError {
    /// Whether this is a configuration authoring conflict, which only
    /// fails the suite it occurred in.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BuildError::TriggerConflict { .. })
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
