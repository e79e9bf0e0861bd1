//! CLI argument definitions using clap with subcommand architecture
//!
//! Every subcommand prints one JSON document on stdout. Logs go to stderr.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::capabilities::Operation;
use crate::provider::ProviderKind;

/// Run git operations and print normalized JSON results
#[derive(Parser, Debug)]
#[command(name = "gitops-engine")]
#[command(about = "Runs git operations and prints normalized JSON results")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "FILE", env = "GITOPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Provider override
    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderArg>,

    /// Repository working directory
    #[arg(short = 'C', long = "directory", value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,

    /// Per-call timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Trace id attached to logs and error diagnostics
    #[arg(long, value_name = "ID", global = true)]
    pub trace_id: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "json", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one operation
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Probe the configured provider
    Health,

    /// List the operations the configured provider supports
    Capabilities,

    /// Show engine configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Operation name (status, commit, cherry_pick, ...)
    #[arg(value_name = "OPERATION", value_parser = clap::value_parser!(Operation))]
    pub operation: Operation,

    /// Options as a JSON object; omitted means defaults
    #[arg(short, long, value_name = "JSON")]
    pub options: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single-line JSON
    #[default]
    Json,
    /// Indented JSON
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Cli,
    Embedded,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Cli => ProviderKind::Cli,
            ProviderArg::Embedded => ProviderKind::Embedded,
        }
    }
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> String {
        let rendered = match self {
            Self::Json => serde_json::to_string(value),
            Self::Pretty => serde_json::to_string_pretty(value),
        };
        // Serializing a Value cannot fail.
        rendered.unwrap_or_default()
    }
}
