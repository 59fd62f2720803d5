//! `seedcat reference` command - Inspect and prune reference tables

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::field::{CatalogField, ReferenceTable};
use crate::core::repository::{CatalogRepository, StoreError};

#[derive(Subcommand, Debug)]
pub enum ReferenceCommands {
    /// List the labels of a reference table
    List {
        /// Table name, e.g. seed_storage or plant_lifespan
        table: ReferenceTable,
    },

    /// Delete a label no entry uses
    Delete {
        table: ReferenceTable,

        /// Label to delete (exact match)
        label: String,
    },

    /// List every reference table
    Tables,
}

pub fn run(cmd: ReferenceCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReferenceCommands::List { table } => run_list(table, global),
        ReferenceCommands::Delete { table, label } => run_delete(table, &label, global),
        ReferenceCommands::Tables => {
            for table in ReferenceTable::ALL {
                let fields: Vec<&str> = CatalogField::referencing(*table)
                    .map(|f| f.name())
                    .collect();
                println!("{}\t{}", table, fields.join(","));
            }
            Ok(())
        }
    }
}

fn run_list(table: ReferenceTable, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, catalog) = open_project(global)?;
    let values = catalog.references(table).into_diagnostic()?;

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&values).into_diagnostic()?
            );
        }
        OutputFormat::Auto => {
            if values.is_empty() {
                println!("No labels in {}.", style(table).cyan());
                return Ok(());
            }
            for value in &values {
                println!("{}", value.label);
            }
            if !global.quiet {
                eprintln!("{} label(s) in {}", style(values.len()).cyan(), style(table).cyan());
            }
        }
        _ => {
            for value in &values {
                println!("{}", value.label);
            }
        }
    }
    Ok(())
}

fn run_delete(table: ReferenceTable, label: &str, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, mut catalog) = open_project(global)?;
    match catalog.delete_reference(table, label) {
        Ok(true) => {
            println!(
                "{} Deleted '{}' from {}",
                style("✓").green(),
                label,
                style(table).cyan()
            );
            Ok(())
        }
        Ok(false) => Err(miette::miette!("No label '{}' in {}", label, table)),
        Err(e @ StoreError::ReferenceInUse { .. }) => Err(miette::miette!(
            help = "Reassign those entries first; labels in use cannot be deleted",
            "{}",
            e
        )),
        Err(e) => Err(e).into_diagnostic(),
    }
}
