//! Build command.

use anyhow::{Context, Result};
use ecfgen_builder::DefinitionBuilder;
use ecfgen_core::Defs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::OutputFormat;

const OUTPUT_STEM: &str = "ecflow";

pub fn run(configs: &[PathBuf], savedir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let doc = super::load_document(configs)?;

    let mut defs = Defs::new();
    let report = DefinitionBuilder::new(&mut defs)
        .build(&doc)
        .context("Definition build aborted")?;

    let rendered = render(&defs, format)?;
    match savedir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(format!("{}.{}", OUTPUT_STEM, format.extension()));
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), suites = defs.suites().len(), "Definition written");
            println!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }

    super::ensure_success(&report)
}

fn render(defs: &Defs, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Def => Ok(format!(
            "# generated by ecfgen on {}\n{}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            defs
        )),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&defs.export())
                .context("Failed to serialize definition")?;
            json.push('\n');
            Ok(json)
        }
    }
}
