//! Error types for ecfgen.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("trigger already defined on {node}: [{existing}] -> [{attempted}]")]
    TriggerConflict {
        node: String,
        existing: String,
        attempted: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
