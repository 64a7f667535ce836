//! Definition node handles.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Handle to a node inside a definition tree.
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("#{_0}")]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Create a handle from an arena index.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Get the underlying arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeHandle {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl From<NodeHandle> for usize {
    fn from(handle: NodeHandle) -> Self {
        handle.0
    }
}
