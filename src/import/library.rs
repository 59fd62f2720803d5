//! Seed-library import
//!
//! One row per species with the seed-sharing columns in a fixed order.
//! Every listed entry is marked as part of the seed library.

use crate::core::entry::FieldValue;
use crate::core::field::CatalogField;
use crate::core::repository::CatalogRepository;
use crate::core::validator::{partition, KeyIndex};

use super::{ImportBatch, ImportError, Table};

/// Seed-sharing columns, in file order after `latin_name`
pub const LIBRARY_FIELDS: &[CatalogField] = &[
    CatalogField::SharingPriority,
    CatalogField::HarvestingIndicator,
    CatalogField::HarvestingMean,
    CatalogField::HarvestingStart,
    CatalogField::SeedHead,
    CatalogField::SeedStorage,
    CatalogField::OneCultivar,
    CatalogField::PackagingMeasure,
    CatalogField::Dormancy,
    CatalogField::SeedPreparation,
    CatalogField::StratificationDuration,
    CatalogField::SeedViability,
    CatalogField::SowingDepth,
];

pub fn expected_header() -> Vec<&'static str> {
    std::iter::once("latin_name")
        .chain(LIBRARY_FIELDS.iter().map(|f| f.name()))
        .collect()
}

/// Column names and order must match exactly
pub fn check_header(table: &Table) -> Result<(), ImportError> {
    let expected = expected_header();
    if table.normalized_headers() != expected {
        return Err(ImportError::HeaderMismatch {
            expected: expected.join(","),
            found: table.headers.join(","),
        });
    }
    Ok(())
}

pub fn apply<R: CatalogRepository>(
    repo: &mut R,
    table: &Table,
    batch: &mut ImportBatch,
) -> Result<(), ImportError> {
    let index = KeyIndex::load(repo)?;

    let mut keyed = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if let Some(key) = batch.row_key(row) {
            keyed.push((row, key));
        }
    }

    let split = partition(keyed, &index, |(_, key)| key.as_str());
    for (row, key) in split.missing {
        batch.not_found(row.line, key);
    }

    let columns: Vec<(usize, CatalogField)> = LIBRARY_FIELDS
        .iter()
        .enumerate()
        .map(|(i, field)| (i + 1, *field))
        .collect();

    for (row, key) in split.present {
        let Some(mut changes) = batch.normalize_row(repo, row, &key, &columns)? else {
            continue;
        };
        changes.push((CatalogField::SeedLibrary, FieldValue::Bool(true)));

        let Some(entry) = repo.find_by_key(&key)? else {
            batch.not_found(row.line, key);
            continue;
        };
        batch.apply_changes(repo, row.line, entry, changes)?;
    }
    Ok(())
}
