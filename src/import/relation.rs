//! Association matrix import
//!
//! The first column is the catalog entry, every further column names a
//! related species in its header (`bee-Bombus impatiens`,
//! `-Wild bergamot-Monarda fistulosa`). A yes/no cell turns the association
//! on or off.

use tracing::{debug, info, warn};

use crate::core::entry::AssociationKind;
use crate::core::normalize::{parse_bool, parse_compound_header, CompoundHeader, Normalized};
use crate::core::repository::CatalogRepository;

use super::{ImportBatch, ImportError, RowIssue, Table};

/// Check `latin_name` and parse every relation header.
///
/// A single malformed header rejects the file.
pub fn parse_headers(
    table: &Table,
    kind: AssociationKind,
) -> Result<Vec<CompoundHeader>, ImportError> {
    let headers = table.normalized_headers();
    if headers.first().map(String::as_str) != Some("latin_name") || headers.len() < 2 {
        return Err(ImportError::HeaderMismatch {
            expected: format!("latin_name,{kind}-<latin name>,..."),
            found: table.headers.join(","),
        });
    }

    table.headers[1..]
        .iter()
        .map(|h| parse_compound_header(h, kind).map_err(ImportError::from))
        .collect()
}

pub fn apply<R: CatalogRepository>(
    repo: &mut R,
    table: &Table,
    kind: AssociationKind,
    headers: &[CompoundHeader],
    delete: bool,
    batch: &mut ImportBatch,
) -> Result<(), ImportError> {
    if delete {
        let removed = repo.clear_associations(kind)?;
        info!(kind = %kind, removed, "removed existing associations");
        batch.summary.associations_removed += removed;
    }

    let targets = resolve_targets(repo, kind, headers, batch)?;

    for row in &table.rows {
        let Some(key) = batch.row_key(row) else {
            continue;
        };
        let Some(entry) = repo.find_by_key(&key)? else {
            if kind.targets_catalog() {
                warn!(line = row.line, key = %key, "entry not in catalog, row skipped");
                batch
                    .summary
                    .skipped
                    .push(RowIssue::new(row.line, key, "entry not in catalog"));
            } else {
                batch.not_found(row.line, key);
            }
            continue;
        };

        let mut toggles = Vec::with_capacity(headers.len());
        let mut missing = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let on = match parse_bool(row.cell(i + 1)) {
                Normalized::Value(on) => on,
                Normalized::Unrecognized(value) => {
                    warn!(
                        line = row.line,
                        key = %key,
                        column = %header.latin_name,
                        value = %value,
                        "unrecognized yes/no value, using no"
                    );
                    batch.summary.unrecognized.push(RowIssue::new(
                        row.line,
                        key.as_str(),
                        format!("{}: '{}' read as no", header.latin_name, value),
                    ));
                    false
                }
            };
            match targets[i] {
                Some(target) => toggles.push((target, on)),
                None if on => missing.push(header.latin_name.as_str()),
                None => {}
            }
        }

        // A relation to an entry that does not exist is never half-written
        if !missing.is_empty() {
            let reason = format!("related entries not in catalog: {}", missing.join(", "));
            warn!(line = row.line, key = %key, reason = %reason, "row skipped");
            batch
                .summary
                .skipped
                .push(RowIssue::new(row.line, key, reason));
            continue;
        }

        let mut changed = false;
        for (target, on) in toggles {
            changed |= repo.set_association(kind, entry.id, target, on)?;
        }
        if changed {
            debug!(line = row.line, key = %key, "associations updated");
            batch.summary.updated += 1;
        } else {
            batch.summary.unchanged += 1;
        }
    }
    Ok(())
}

/// Storage id for each header column.
///
/// Species records are created on demand. Catalog targets must already
/// exist; a missing one is `None`.
fn resolve_targets<R: CatalogRepository>(
    repo: &mut R,
    kind: AssociationKind,
    headers: &[CompoundHeader],
    batch: &mut ImportBatch,
) -> Result<Vec<Option<i64>>, ImportError> {
    let mut targets = Vec::with_capacity(headers.len());
    for header in headers {
        if kind.targets_catalog() {
            let target = repo.find_by_key(&header.latin_name)?;
            if target.is_none() {
                warn!(column = %header.latin_name, "related entry not in catalog");
            }
            targets.push(target.map(|e| e.id));
        } else {
            let (species, created) = repo.get_or_create_species(
                kind,
                &header.latin_name,
                header.english_name.as_deref(),
            )?;
            if created {
                info!(kind = %kind, latin_name = %species.latin_name, "created species record");
                batch.summary.species_created += 1;
            }
            targets.push(Some(species.id));
        }
    }
    Ok(targets)
}
