//! Definition tree contract.
//!
//! The builder never constructs definition objects itself. It drives an
//! implementation of [`DefinitionTree`], which owns the suites, families
//! and tasks and hands back [`NodeHandle`]s for later attribute calls.

use serde::{Deserialize, Serialize};

use crate::{NodeHandle, Result};

/// Kind of a definition object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Suite,
    Family,
    Task,
}

impl DefKind {
    /// Keyword that opens this node in the `.def` format.
    pub fn keyword(&self) -> &'static str {
        match self {
            DefKind::Suite => "suite",
            DefKind::Family => "family",
            DefKind::Task => "task",
        }
    }

    /// Whether nodes of this kind may hold families and tasks.
    pub fn is_container(&self) -> bool {
        matches!(self, DefKind::Suite | DefKind::Family)
    }
}

impl std::fmt::Display for DefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Trait for definition tree backends.
///
/// Calls are expected in builder order: a node is created before any
/// attribute is attached to it. Adding a child that already exists with
/// the same kind returns the existing handle, re-adding an edit replaces
/// its value and re-adding an event is a no-op.
pub trait DefinitionTree {
    /// Create a new top-level suite. Suite names are unique; creating a
    /// suite that already exists fails with
    /// [`crate::Error::InvalidOperation`].
    fn create_suite(&mut self, name: &str) -> Result<NodeHandle>;

    /// Add a family beneath a suite or family.
    fn add_family(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle>;

    /// Add a task beneath a suite or family.
    fn add_task(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle>;

    /// Set a variable on a node.
    fn add_edit(&mut self, node: NodeHandle, key: &str, value: &str) -> Result<()>;

    /// Add a named event to a family or task.
    fn add_event(&mut self, node: NodeHandle, name: &str) -> Result<()>;

    /// Set the trigger expression of a family or task.
    ///
    /// A node holds at most one trigger; a second call fails with
    /// [`crate::Error::TriggerConflict`].
    fn add_trigger(&mut self, node: NodeHandle, expression: &str) -> Result<()>;

    /// Declare an external node path referenced by triggers.
    fn add_extern(&mut self, path: &str) -> Result<()>;

    /// Remove a suite and everything beneath it.
    fn discard_suite(&mut self, suite: NodeHandle) -> Result<()>;
}
