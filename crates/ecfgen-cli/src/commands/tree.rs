//! Tree command.

use anyhow::Result;
use ecfgen_config::ConfigNode;
use std::path::PathBuf;

pub fn run(configs: &[PathBuf]) -> Result<()> {
    let doc = super::load_document(configs)?;
    for tree in doc.suites() {
        for node in tree.root().traverse_down() {
            println!("{}", describe(node));
        }
    }
    Ok(())
}

fn describe(node: ConfigNode<'_>) -> String {
    let depth = node.traverse_up().len() - 1;
    let mut line = format!("{}{} [{}]", "  ".repeat(depth), node.name(), node.kind());
    if let Some(role) = node.role() {
        line.push_str(&format!(" {} {}", role, node.local_path()));
    }
    line
}
