//! `seedcat fields` command - List the catalog field table

use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::field::{CatalogField, FieldKind};
use crate::core::query::parameter_names;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let filterable = parameter_names();
    let rows: Vec<[String; 3]> = CatalogField::ALL
        .iter()
        .map(|field| {
            let kind = match field.kind() {
                FieldKind::Reference(table) => format!("reference ({})", table),
                other => other.label().to_string(),
            };
            let filter = if filterable.contains(&field.name()) {
                "yes"
            } else {
                ""
            };
            [field.name().to_string(), kind, filter.to_string()]
        })
        .collect();

    match global.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|[name, kind, filter]| {
                    serde_json::json!({
                        "name": name,
                        "kind": kind,
                        "filterable": !filter.is_empty(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Csv | OutputFormat::Tsv => {
            let sep = if global.format == OutputFormat::Csv { "," } else { "\t" };
            for [name, kind, _] in &rows {
                println!("{}{}{}", name, sep, kind);
            }
        }
        OutputFormat::Auto | OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Kind", "Search"]);
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
    }
    Ok(())
}
