//! `seedcat init` command - Initialize a new seedcat project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Reinitialize even if .seedcat/ already exists (the catalog is kept)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized seedcat project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Load the catalog from a spreadsheet",
                style("seedcat import populate catalog.xlsx").yellow()
            );
            println!(
                "  {} Print the header an import expects",
                style("seedcat import --template library").yellow()
            );
            println!(
                "  {} Find full-sun species",
                style("seedcat search --param full_sun=1").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} seedcat project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("seedcat init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [".seedcat/", ".seedcat/config.yaml", ".seedcat/catalog.db", "imports/"];
    for entry in entries {
        let exists = root.join(entry.trim_end_matches('/')).exists();
        let marker = if exists {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {}", marker, entry);
    }
}
