//! Core definition types and traits for ecfgen.
//!
//! This crate contains:
//! - The definition tree contract consumed by the builder
//! - Node handles and definition kinds
//! - An in-memory definition tree with ecFlow `.def` rendering

pub mod defs;
pub mod definition;
pub mod error;
pub mod id;

pub use definition::{DefKind, DefinitionTree};
pub use defs::{DefNode, Defs, DefsDocument, ExportedNode};
pub use error::{Error, Result};
pub use id::NodeHandle;
