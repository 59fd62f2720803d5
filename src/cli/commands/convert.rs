//! `seedcat convert` command - Spreadsheet to CSV

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::import::{spreadsheet_to_csv, SourceFormat};

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Spreadsheet to convert (.xlsx, .xlsm, .xls, .xlsb, .ods)
    pub input: PathBuf,

    /// Output CSV file (default: input name with .csv extension)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write CSV to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

pub fn run(args: ConvertArgs, global: &GlobalOpts) -> Result<()> {
    if SourceFormat::detect(&args.input) != Some(SourceFormat::Spreadsheet) {
        return Err(miette::miette!(
            "{} is not a spreadsheet (.xlsx, .xlsm, .xls, .xlsb, .ods)",
            args.input.display()
        ));
    }

    let csv = spreadsheet_to_csv(&args.input)?;

    if args.stdout {
        std::io::stdout().lock().write_all(&csv).into_diagnostic()?;
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("csv"));
    std::fs::write(&output, &csv).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Converted {} to {}",
            style("✓").green(),
            style(args.input.display()).cyan(),
            style(output.display()).yellow()
        );
    }
    Ok(())
}
