//! Full catalog repopulation
//!
//! Empties the catalog and inserts one entry per row. Only runs outside
//! production mode.

use tracing::{debug, warn};

use crate::core::entry::CatalogEntry;
use crate::core::field::CatalogField;
use crate::core::repository::CatalogRepository;

use super::{ImportBatch, ImportError, Table};

/// `latin_name` first, then any known field names
pub fn parse_headers(table: &Table) -> Result<Vec<CatalogField>, ImportError> {
    let headers = table.normalized_headers();
    if headers.first().map(String::as_str) != Some("latin_name") {
        return Err(ImportError::HeaderMismatch {
            expected: "latin_name,<field>,...".to_string(),
            found: table.headers.join(","),
        });
    }

    let mut fields: Vec<CatalogField> = Vec::with_capacity(headers.len() - 1);
    for (header, raw) in headers.iter().zip(&table.headers).skip(1) {
        let field = CatalogField::from_name(header).ok_or_else(|| ImportError::UnknownColumn {
            column: raw.clone(),
        })?;
        if fields.contains(&field) {
            return Err(ImportError::HeaderMismatch {
                expected: format!("'{}' once", field),
                found: table.headers.join(","),
            });
        }
        fields.push(field);
    }
    Ok(fields)
}

pub fn apply<R: CatalogRepository>(
    repo: &mut R,
    table: &Table,
    fields: &[CatalogField],
    batch: &mut ImportBatch,
) -> Result<(), ImportError> {
    warn!(path = %table.path.display(), "clearing catalog before repopulating");
    repo.clear_catalog()?;

    let columns: Vec<(usize, CatalogField)> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| (i + 1, *field))
        .collect();

    for row in &table.rows {
        let Some(key) = batch.row_key(row) else {
            continue;
        };
        let Some(changes) = batch.normalize_row(repo, row, &key, &columns)? else {
            continue;
        };

        let mut entry = CatalogEntry::new(key);
        for (field, value) in changes {
            entry.set(field, value);
        }
        match repo.upsert(&entry) {
            Ok(stored) => {
                debug!(line = row.line, key = %stored.latin_name, "created entry");
                batch.summary.created += 1;
            }
            Err(e) => batch.record_write_error(row.line, &entry.latin_name, e)?,
        }
    }
    Ok(())
}
