//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, convert::ConvertArgs, entry::EntryCommands,
    export::ExportArgs, import::ImportArgs, init::InitArgs, reference::ReferenceCommands,
    search::SearchArgs,
};

#[derive(Parser)]
#[command(name = "seedcat")]
#[command(author, version, about = "Seed library catalog toolkit")]
#[command(
    long_about = "Maintain a native-plant seed catalog from CSV and spreadsheet files, and search it."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .seedcat/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new seedcat project
    Init(InitArgs),

    /// Import catalog data from CSV or spreadsheet files
    Import(ImportArgs),

    /// Catalog entry management
    #[command(subcommand)]
    Entry(EntryCommands),

    /// Export one field as `latin_name,<field>` CSV
    Export(ExportArgs),

    /// Search the catalog with filter parameters
    Search(SearchArgs),

    /// Reference table management
    #[command(subcommand)]
    Reference(ReferenceCommands),

    /// Convert the first sheet of a spreadsheet to CSV
    Convert(ConvertArgs),

    /// List catalog fields and their kinds
    Fields,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}
