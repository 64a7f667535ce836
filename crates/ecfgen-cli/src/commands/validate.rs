//! Validate command.

use anyhow::{Context, Result};
use ecfgen_builder::{DefinitionBuilder, SuiteState};
use ecfgen_core::Defs;
use std::path::PathBuf;

pub fn run(configs: &[PathBuf]) -> Result<()> {
    let doc = super::load_document(configs)?;

    let mut scratch = Defs::new();
    let report = DefinitionBuilder::new(&mut scratch)
        .build(&doc)
        .context("Definition build aborted")?;

    for (suite, state) in &report.suite_states {
        match state {
            SuiteState::Built => println!("ok      {}", suite),
            SuiteState::Failed(err) => println!("FAILED  {}: {}", suite, err),
        }
    }
    if report.suite_states.is_empty() {
        println!("No suites defined");
    }

    super::ensure_success(&report)?;
    println!("Configuration is valid");
    Ok(())
}
