//! ecfgen CLI tool.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ecfgen")]
#[command(about = "Generate ecFlow suite definitions from YAML", long_about = None)]
struct Cli {
    /// Configuration file; repeat to merge several, later files win
    #[arg(
        short,
        long = "config",
        global = true,
        env = "ECFGEN_CONFIG",
        value_delimiter = ',',
        default_value = "ecflow_build.yml"
    )]
    configs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the definition and write it out
    Build {
        /// Directory to write the definition into; stdout when omitted
        #[arg(short, long, env = "ECFGEN_SAVEDIR")]
        savedir: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Def)]
        format: OutputFormat,
    },
    /// Build into a scratch definition and report per-suite results
    Validate,
    /// Print every configuration node with its kind and workflow path
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ecFlow text definition
    Def,
    /// JSON export of the definition tree
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Def => "def",
            OutputFormat::Json => "json",
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries definitions
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { savedir, format } => {
            commands::build::run(&cli.configs, savedir.as_deref(), format)?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.configs)?;
        }
        Commands::Tree => {
            commands::tree::run(&cli.configs)?;
        }
    }

    Ok(())
}
