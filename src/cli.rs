//! CLI definitions for tablewatch.

use std::path::PathBuf;

use clap::Parser;

/// tablewatch CLI.
#[derive(Parser, Debug)]
#[command(name = "tablewatch")]
#[command(about = "Watch a rendered web table and store every change")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/tablewatch.toml", env = "TABLEWATCH_CONFIG")]
    pub config: PathBuf,

    /// Log level override (RUST_LOG still wins)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Load and validate the configuration, print the schema and exit
    #[arg(long)]
    pub check: bool,
}
