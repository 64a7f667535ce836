//! Definition building for ecfgen.
//!
//! Walks each suite of a configuration document and applies it to a
//! [`ecfgen_core::DefinitionTree`].

pub mod builder;
pub mod error;

pub use builder::{BuildReport, DefinitionBuilder, SuiteState};
pub use error::{BuildError, BuildResult};
