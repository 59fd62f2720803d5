//! `seedcat import` command - Bulk import from CSV and spreadsheet files

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::entry::AssociationKind;
use crate::core::field::CatalogField;
use crate::import::{
    import_directory, import_file, ImportOptions, ImportSummary, Pipeline, RowIssue,
};

#[derive(clap::Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct ImportArgs {
    #[command(subcommand)]
    pub command: Option<ImportCommands>,

    /// Print the header a pipeline expects (library, populate, a relation kind or a field)
    #[arg(long, value_name = "PIPELINE")]
    pub template: Option<Pipeline>,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Update one field: `latin_name,<field>`
    Property {
        /// Field to update (see `seedcat fields`)
        field: CatalogField,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Seed-library columns for existing entries
    Library {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Species association matrix (bee, butterfly, nonnative, companion, complementary)
    Relation {
        kind: AssociationKind,

        #[command(flatten)]
        source: SourceArgs,

        /// Remove every existing association of this kind first
        #[arg(long)]
        delete: bool,
    },

    /// Empty the catalog and load it from one file (development mode only)
    Populate {
        /// CSV or spreadsheet file
        file: PathBuf,

        /// Compute the summary without committing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// CSV or spreadsheet file
    #[arg(required_unless_present = "directory")]
    pub file: Option<PathBuf>,

    /// Import every CSV or spreadsheet file in a directory
    #[arg(long, short = 'd', conflicts_with = "file")]
    pub directory: Option<PathBuf>,

    /// Compute the summary without committing anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if let Some(pipeline) = args.template {
        return print_template(pipeline, global);
    }

    let command = args.command.ok_or_else(|| {
        miette::miette!("Pipeline required. Usage: seedcat import property full_sun data.csv")
    })?;

    let (pipeline, file, directory, dry_run) = match command {
        ImportCommands::Property { field, source } => {
            (Pipeline::Property(field), source.file, source.directory, source.dry_run)
        }
        ImportCommands::Library { source } => {
            (Pipeline::Library, source.file, source.directory, source.dry_run)
        }
        ImportCommands::Relation {
            kind,
            source,
            delete,
        } => (
            Pipeline::Relation { kind, delete },
            source.file,
            source.directory,
            source.dry_run,
        ),
        ImportCommands::Populate { file, dry_run } => {
            (Pipeline::Populate, Some(file), None, dry_run)
        }
    };

    let (_project, config, mut catalog) = open_project(global)?;
    let options = ImportOptions {
        dry_run,
        mode: config.mode(),
    };
    let limit = config.display_limit();

    if let Some(dir) = directory {
        return run_directory(&mut catalog, &dir, pipeline, options, limit, global);
    }

    let file = file.ok_or_else(|| miette::miette!("File or --directory required"))?;
    if !file.exists() {
        return Err(miette::miette!("File not found: {}", file.display()));
    }

    if !global.quiet {
        println!(
            "{} Importing {} from {}{}",
            style("→").blue(),
            style(pipeline).cyan(),
            style(file.display()).yellow(),
            if dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    let summary = import_file(&mut catalog, &file, pipeline, options)?;
    print_summary(&summary, limit);
    Ok(())
}

fn run_directory(
    catalog: &mut crate::core::SqliteCatalog,
    dir: &Path,
    pipeline: Pipeline,
    options: ImportOptions,
    limit: usize,
    global: &GlobalOpts,
) -> Result<()> {
    let reports = import_directory(catalog, dir, pipeline, options)?;
    if reports.is_empty() {
        println!(
            "{} No CSV or spreadsheet files in {}",
            style("!").yellow(),
            style(dir.display()).cyan()
        );
        return Ok(());
    }

    let mut total = ImportSummary::default();
    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(summary) => {
                if !global.quiet {
                    println!(
                        "{} {} ({} rows, {} updated, {} problems)",
                        style("✓").green(),
                        style(report.path.display()).cyan(),
                        summary.rows_processed,
                        summary.updated + summary.created,
                        summary.problem_count()
                    );
                }
                total.merge(summary);
            }
            Err(e) => {
                failed += 1;
                println!(
                    "{} {}: {}",
                    style("✗").red(),
                    style(report.path.display()).cyan(),
                    e
                );
            }
        }
    }

    println!();
    println!(
        "{} file(s) imported, {} failed",
        style(reports.len() - failed).green(),
        if failed > 0 {
            style(failed).red()
        } else {
            style(failed).dim()
        }
    );
    print_summary(&total, limit);

    if failed > 0 {
        return Err(miette::miette!("{} file(s) could not be imported", failed));
    }
    Ok(())
}

fn print_summary(summary: &ImportSummary, limit: usize) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Import Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed:     {}", style(summary.rows_processed).cyan());
    if summary.created > 0 {
        println!("  Created:            {}", style(summary.created).green());
    }
    println!("  Updated:            {}", style(summary.updated).green());
    println!("  Unchanged:          {}", style(summary.unchanged).dim());
    if !summary.not_found.is_empty() {
        println!("  Not found:          {}", style(summary.not_found.len()).yellow());
    }
    if !summary.invalid.is_empty() {
        println!("  Invalid:            {}", style(summary.invalid.len()).red());
    }
    if !summary.integrity.is_empty() {
        println!("  Integrity errors:   {}", style(summary.integrity.len()).red());
    }
    if !summary.skipped.is_empty() {
        println!("  Skipped:            {}", style(summary.skipped.len()).yellow());
    }
    if !summary.unrecognized.is_empty() {
        println!(
            "  Unrecognized:       {}",
            style(summary.unrecognized.len()).yellow()
        );
    }
    if !summary.references_created.is_empty() {
        println!(
            "  References created: {}",
            style(summary.references_created.len()).cyan()
        );
    }
    if summary.species_created > 0 {
        println!("  Species created:    {}", style(summary.species_created).cyan());
    }
    if summary.associations_removed > 0 {
        println!(
            "  Associations removed: {}",
            style(summary.associations_removed).yellow()
        );
    }

    print_keys("Not found", summary.not_found.iter().map(String::as_str), limit);
    print_issues("Invalid", &summary.invalid, limit);
    print_issues("Integrity errors", &summary.integrity, limit);
    print_issues("Skipped", &summary.skipped, limit);
    print_issues("Unrecognized", &summary.unrecognized, limit);
    print_keys(
        "References created",
        summary
            .references_created
            .iter()
            .map(|r| r.label.as_str()),
        limit,
    );

    if summary.dry_run {
        println!();
        println!(
            "{}",
            style("Dry run complete. No changes were committed.").yellow()
        );
    }
}

fn print_keys<'a>(title: &str, keys: impl ExactSizeIterator<Item = &'a str>, limit: usize) {
    let total = keys.len();
    if total == 0 {
        return;
    }
    println!();
    print_list_title(title, total, limit);
    for key in keys.take(limit) {
        println!("  - {}", key);
    }
}

fn print_issues(title: &str, issues: &[RowIssue], limit: usize) {
    if issues.is_empty() {
        return;
    }
    println!();
    print_list_title(title, issues.len(), limit);
    for issue in issues.iter().take(limit) {
        let key = if issue.key.is_empty() {
            "(no latin name)"
        } else {
            issue.key.as_str()
        };
        println!(
            "  - line {}: {} {}",
            issue.line,
            key,
            style(&issue.reason).dim()
        );
    }
}

fn print_list_title(title: &str, total: usize, limit: usize) {
    if total > limit {
        println!(
            "{} (showing {} of {}):",
            style(title).bold(),
            limit,
            total
        );
    } else {
        println!("{}:", style(title).bold());
    }
}

/// Print the expected header to stdout so it can be redirected to a file
fn print_template(pipeline: Pipeline, global: &GlobalOpts) -> Result<()> {
    println!("{}", pipeline.template());

    if !global.quiet {
        eprintln!();
        eprintln!(
            "{} Template generated. Redirect to file: seedcat import --template {} > {}.csv",
            style("✓").green(),
            template_name(pipeline),
            template_name(pipeline)
        );
    }
    std::io::Write::flush(&mut std::io::stdout()).into_diagnostic()?;
    Ok(())
}

fn template_name(pipeline: Pipeline) -> String {
    match pipeline {
        Pipeline::Property(field) => field.name().to_string(),
        Pipeline::Library => "library".to_string(),
        Pipeline::Relation { kind, .. } => kind.as_str().to_string(),
        Pipeline::Populate => "populate".to_string(),
    }
}
