//! `seedcat export` command - Write one field as CSV

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::export::export_field;
use crate::core::field::CatalogField;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Field to export (see `seedcat fields`)
    pub field: CatalogField,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, catalog) = open_project(global)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let count = export_field(&catalog, args.field, BufWriter::new(file)).into_diagnostic()?;
            if !global.quiet {
                eprintln!(
                    "{} Exported {} for {} entries to {}",
                    style("✓").green(),
                    style(args.field).cyan(),
                    count,
                    style(path.display()).yellow()
                );
            }
        }
        None => {
            export_field(&catalog, args.field, io::stdout().lock()).into_diagnostic()?;
        }
    }
    Ok(())
}
