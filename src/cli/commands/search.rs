//! `seedcat search` command - Filter the catalog
//!
//! Parameters are the same flat `name=value` pairs a search form submits:
//! trait flags (`full_sun=1`), name substrings (`name=maple`), ranges
//! (`bloom_start=5`) and categories (`color=Red`).

use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;

use crate::cli::commands::entry::print_entries;
use crate::cli::helpers::{open_project, parse_key_val};
use crate::cli::GlobalOpts;
use crate::core::query::{parameter_names, CatalogFilter};
use crate::core::repository::CatalogRepository;

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Filter parameter as key=value (repeatable)
    #[arg(long = "param", short = 'p', value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Limit number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Show only count
    #[arg(long)]
    pub count: bool,

    /// List the accepted parameter names
    #[arg(long)]
    pub list_params: bool,
}

pub fn run(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    if args.list_params {
        for name in parameter_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let params: BTreeMap<String, String> = args.params.into_iter().collect();
    let filter = CatalogFilter::from_params(&params).map_err(|e| {
        miette::miette!(
            help = "Run 'seedcat search --list-params' to see accepted parameters",
            "{}",
            e
        )
    })?;

    let (_project, _config, catalog) = open_project(global)?;
    let mut results = catalog.search(&filter).into_diagnostic()?;

    if args.count {
        println!("{}", results.len());
        return Ok(());
    }

    let total = results.len();
    results.truncate(args.limit);
    print_entries(&results, global.format)?;

    if total > results.len() && !global.quiet {
        eprintln!(
            "{} showing {} of {} matches, raise {} to see more",
            style("!").yellow(),
            results.len(),
            total,
            style("--limit").cyan()
        );
    }
    Ok(())
}
