//! `seedcat entry` command - Catalog entry management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, open_project, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entry::{AssociationKind, CatalogEntry, FieldValue};
use crate::core::field::CatalogField;
use crate::core::normalize::normalize_key;
use crate::core::repository::CatalogRepository;

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// Add a catalog entry
    New {
        /// Latin name (the import key)
        latin_name: String,

        /// English common name
        #[arg(long, short = 'e')]
        english: Option<String>,

        /// French common name
        #[arg(long)]
        french: Option<String>,
    },

    /// Show every field of an entry
    Show {
        /// Latin name (case-insensitive)
        latin_name: String,

        /// Include fields that still hold their default
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// List catalog entries
    List {
        /// Limit number of results
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
}

pub fn run(cmd: EntryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        EntryCommands::New {
            latin_name,
            english,
            french,
        } => run_new(&latin_name, english, french, global),
        EntryCommands::Show { latin_name, all } => run_show(&latin_name, all, global),
        EntryCommands::List { limit } => run_list(limit, global),
    }
}

fn run_new(
    latin_name: &str,
    english: Option<String>,
    french: Option<String>,
    global: &GlobalOpts,
) -> Result<()> {
    let (_project, _config, mut catalog) = open_project(global)?;
    let latin_name =
        normalize_key(latin_name).ok_or_else(|| miette::miette!("Latin name cannot be empty"))?;

    if catalog.find_by_key(&latin_name).into_diagnostic()?.is_some() {
        return Err(miette::miette!(
            "'{}' is already in the catalog",
            latin_name
        ));
    }

    let mut entry = CatalogEntry::new(latin_name);
    if let Some(english) = english {
        entry.set(CatalogField::EnglishName, FieldValue::Text(english));
    }
    if let Some(french) = french {
        entry.set(CatalogField::FrenchName, FieldValue::Text(french));
    }
    let stored = catalog.upsert(&entry).into_diagnostic()?;

    println!(
        "{} Added {}",
        style("✓").green(),
        style(&stored.latin_name).cyan().italic()
    );
    Ok(())
}

fn run_show(latin_name: &str, all: bool, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, catalog) = open_project(global)?;
    let entry = catalog
        .find_by_key(latin_name)
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("No catalog entry named '{}'", latin_name))?;

    let mut associations = Vec::new();
    for kind in AssociationKind::ALL {
        let names = catalog.associations(*kind, entry.id).into_diagnostic()?;
        if !names.is_empty() {
            associations.push((*kind, names));
        }
    }

    if global.format == OutputFormat::Json {
        let mut json = entry.to_json();
        if let serde_json::Value::Object(map) = &mut json {
            for (kind, names) in &associations {
                map.insert(kind.as_str().to_string(), serde_json::json!(names));
            }
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&json).into_diagnostic()?
        );
        return Ok(());
    }

    println!("{}", style(&entry.latin_name).bold().italic());
    if let Some(updated) = &entry.updated_at {
        println!("{}", style(format!("updated {}", updated)).dim());
    }
    println!();
    for (field, value) in entry.fields() {
        if !all && value == FieldValue::default_for(field) {
            continue;
        }
        println!("  {:<24} {}", style(field.name()).dim(), value);
    }
    for (kind, names) in &associations {
        println!();
        println!("  {}:", style(kind.as_str()).bold());
        for name in names {
            println!("    - {}", style(name).italic());
        }
    }
    Ok(())
}

fn run_list(limit: Option<usize>, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, catalog) = open_project(global)?;
    let mut entries = catalog.entries().into_diagnostic()?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    print_entries(&entries, global.format)
}

/// Shared list output for `entry list` and `search`
pub fn print_entries(entries: &[CatalogEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = entries.iter().map(CatalogEntry::to_json).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json).into_diagnostic()?
            );
        }
        OutputFormat::Csv => {
            println!("latin_name,english_name,french_name");
            for entry in entries {
                println!(
                    "{},{},{}",
                    escape_csv(&entry.latin_name),
                    escape_csv(&entry.english_name().unwrap_or_default()),
                    escape_csv(&entry.french_name().unwrap_or_default())
                );
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Latin name", "English name", "French name"]);
            for entry in entries {
                builder.push_record([
                    entry.latin_name.clone(),
                    entry.english_name().unwrap_or_default(),
                    entry.french_name().unwrap_or_default(),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Tsv => {
            for entry in entries {
                println!(
                    "{}\t{}\t{}",
                    entry.latin_name,
                    entry.english_name().unwrap_or_default(),
                    entry.french_name().unwrap_or_default()
                );
            }
        }
        OutputFormat::Auto => {
            if entries.is_empty() {
                println!("No matching entries.");
                return Ok(());
            }
            println!(
                "{:<32} {:<28} {:<28}",
                style("LATIN NAME").bold(),
                style("ENGLISH NAME").bold(),
                style("FRENCH NAME").bold()
            );
            println!("{}", "-".repeat(88));
            for entry in entries {
                println!(
                    "{:<32} {:<28} {:<28}",
                    style(truncate_str(&entry.latin_name, 30)).italic(),
                    truncate_str(&entry.english_name().unwrap_or_default(), 26),
                    truncate_str(&entry.french_name().unwrap_or_default(), 26)
                );
            }
            println!();
            println!("{} entry(ies) found", style(entries.len()).cyan());
        }
    }
    Ok(())
}
