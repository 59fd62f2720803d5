//! Single-field import: `latin_name,<field>`

use crate::core::field::CatalogField;
use crate::core::repository::CatalogRepository;
use crate::core::validator::{partition, KeyIndex};

use super::{ImportBatch, ImportError, Table};

/// The header must be exactly `latin_name,<field>`
pub fn check_header(table: &Table, field: CatalogField) -> Result<(), ImportError> {
    let expected = ["latin_name", field.name()];
    if table.normalized_headers() != expected {
        return Err(ImportError::HeaderMismatch {
            expected: expected.join(","),
            found: table.headers.join(","),
        });
    }
    Ok(())
}

/// Update `field` on every listed entry whose value differs
pub fn apply<R: CatalogRepository>(
    repo: &mut R,
    table: &Table,
    field: CatalogField,
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

    let columns = [(1, field)];
    for (row, key) in split.present {
        let Some(changes) = batch.normalize_row(repo, row, &key, &columns)? else {
            continue;
        };
        let Some(entry) = repo.find_by_key(&key)? else {
            batch.not_found(row.line, key);
            continue;
        };
        batch.apply_changes(repo, row.line, entry, changes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::entry::FieldValue;
    use crate::core::field::{CatalogField, ReferenceTable};
    use crate::core::memory::MemoryCatalog;
    use crate::core::repository::CatalogRepository;
    use crate::import::tests::run;
    use crate::import::{ImportError, Pipeline};

    #[test]
    fn test_yes_flips_drought_tolerant() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,drought_tolerant\nAcer rubrum,yes\n",
            Pipeline::Property(CatalogField::DroughtTolerant),
        )
        .unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.rows_processed, 1);
        let entry = repo.find_by_key("Acer rubrum").unwrap().unwrap();
        assert_eq!(
            entry.get(CatalogField::DroughtTolerant),
            FieldValue::Bool(true)
        );
    }

    #[test]
    fn test_same_value_is_unchanged() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,drought_tolerant\nAcer rubrum,no\n",
            Pipeline::Property(CatalogField::DroughtTolerant),
        )
        .unwrap();
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.unchanged, 1);
    }

    #[test]
    fn test_missing_column_aborts_before_any_row() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let err = run(
            &mut repo,
            "latin_name\nAcer rubrum\n",
            Pipeline::Property(CatalogField::DroughtTolerant),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::HeaderMismatch { .. }));
        let entry = repo.find_by_key("Acer rubrum").unwrap().unwrap();
        assert_eq!(
            entry.get(CatalogField::DroughtTolerant),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let summary = run(
            &mut repo,
            "Latin_Name, Full_Sun \nAcer rubrum,Y\n",
            Pipeline::Property(CatalogField::FullSun),
        )
        .unwrap();
        assert_eq!(summary.updated, 1);
    }

    #[test]
    fn test_unknown_key_is_not_found_and_run_continues() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,full_sun\nQuercus alba,yes\nacer rubrum,yes\n",
            Pipeline::Property(CatalogField::FullSun),
        )
        .unwrap();
        assert_eq!(summary.not_found, vec!["Quercus alba".to_string()]);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.rows_processed, 2);
    }

    #[test]
    fn test_unrecognized_boolean_is_reported_and_read_as_no() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,full_sun\nAcer rubrum,maybe\n",
            Pipeline::Property(CatalogField::FullSun),
        )
        .unwrap();
        assert_eq!(summary.unrecognized.len(), 1);
        assert_eq!(summary.unrecognized[0].line, 2);
        assert_eq!(summary.unchanged, 1);
    }

    #[test]
    fn test_unparseable_number_skips_row() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,height_max\nAcer rubrum,very tall\n",
            Pipeline::Property(CatalogField::HeightMax),
        )
        .unwrap();
        assert_eq!(summary.invalid.len(), 1);
        assert_eq!(summary.updated, 0);
    }

    #[test]
    fn test_height_invariant_violation_is_invalid() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        run(
            &mut repo,
            "latin_name,height_max\nAcer rubrum,2\n",
            Pipeline::Property(CatalogField::HeightMax),
        )
        .unwrap();

        let summary = run(
            &mut repo,
            "latin_name,height_min\nAcer rubrum,3\n",
            Pipeline::Property(CatalogField::HeightMin),
        )
        .unwrap();
        assert_eq!(summary.invalid.len(), 1);
        assert_eq!(summary.updated, 0);
    }

    #[test]
    fn test_reference_labels_are_created_once() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        repo.add_entry("Acer saccharum").unwrap();

        let summary = run(
            &mut repo,
            "latin_name,color\nAcer rubrum,Red\nAcer saccharum,Red\n",
            Pipeline::Property(CatalogField::Color),
        )
        .unwrap();
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.references_created.len(), 1);
        assert_eq!(repo.references(ReferenceTable::Color).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_reference_cell_keeps_value() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        run(
            &mut repo,
            "latin_name,color\nAcer rubrum,Red\n",
            Pipeline::Property(CatalogField::Color),
        )
        .unwrap();

        let summary = run(
            &mut repo,
            "latin_name,color\nAcer rubrum,\n",
            Pipeline::Property(CatalogField::Color),
        )
        .unwrap();
        assert_eq!(summary.unchanged, 1);
        let entry = repo.find_by_key("Acer rubrum").unwrap().unwrap();
        assert_eq!(entry.get(CatalogField::Color).as_text(), Some("Red"));
    }
}
