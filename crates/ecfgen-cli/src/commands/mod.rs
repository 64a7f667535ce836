//! CLI command implementations.

pub mod build;
pub mod tree;
pub mod validate;

use anyhow::{Context, Result};
use ecfgen_builder::BuildReport;
use ecfgen_config::ConfigDocument;
use std::path::PathBuf;
use tracing::info;

/// Load and merge configuration files in order.
pub fn load_document(paths: &[PathBuf]) -> Result<ConfigDocument> {
    let mut merged = ConfigDocument::default();
    for path in paths {
        let doc = ConfigDocument::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?;
        info!(config = %path.display(), suites = doc.suite_names().len(), "Loaded configuration");
        merged = merged.merge(doc);
    }
    Ok(merged)
}

/// Fail with a summary when any suite did not build.
pub fn ensure_success(report: &BuildReport) -> Result<()> {
    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!(
            "{} of {} suite(s) failed to build",
            failed,
            report.suite_states.len()
        );
    }
    Ok(())
}
