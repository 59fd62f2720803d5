//! Bulk import of catalog data from CSV and spreadsheet files
//!
//! Every pipeline follows the same steps: read the file (spreadsheets are
//! converted to CSV), check the header contract, reject duplicate keys where
//! the pipeline needs unique rows, then normalize, resolve and write each
//! row inside one transaction. Header and duplicate failures happen before
//! the transaction opens, so a malformed file never writes anything.

pub mod error;
pub mod library;
pub mod populate;
pub mod property;
pub mod relation;
pub mod source;
pub mod summary;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::config::Mode;
use crate::core::entry::{AssociationKind, CatalogEntry, FieldValue};
use crate::core::field::CatalogField;
use crate::core::normalize::{normalize_cell, normalize_key, CellValue, Normalized};
use crate::core::repository::{CatalogRepository, StoreError};
use crate::core::resolver::ReferenceResolver;
use crate::core::validator::find_duplicates;

pub use error::ImportError;
pub use source::{read_table, spreadsheet_to_csv, Row, SourceFormat, Table};
pub use summary::{ImportSummary, RowIssue};

/// Which import to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// `latin_name,<field>`: update one field on existing entries
    Property(CatalogField),
    /// Fixed seed-library columns on existing entries
    Library,
    /// `latin_name` plus one compound header per related species
    Relation { kind: AssociationKind, delete: bool },
    /// Empty the catalog and insert every row
    Populate,
}

impl Pipeline {
    /// Expected header line, as printed by `seedcat import --template`
    pub fn template(&self) -> String {
        match self {
            Pipeline::Property(field) => format!("latin_name,{}", field.name()),
            Pipeline::Library => library::expected_header().join(","),
            Pipeline::Relation { kind, .. } => format!(
                "latin_name,{kind}-<latin name>,{kind}-<english name>-<latin name>"
            ),
            Pipeline::Populate => std::iter::once("latin_name")
                .chain(CatalogField::ALL.iter().map(|f| f.name()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Pipelines that write whole rows refuse files listing a key twice
    fn requires_unique_keys(&self) -> bool {
        matches!(self, Pipeline::Library | Pipeline::Populate)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Property(field) => write!(f, "property {}", field),
            Pipeline::Library => f.write_str("library"),
            Pipeline::Relation { kind, .. } => write!(f, "relation {}", kind),
            Pipeline::Populate => f.write_str("populate"),
        }
    }
}

impl FromStr for Pipeline {
    type Err = String;

    /// `library`, `populate`, an association kind or a field name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "library" => return Ok(Pipeline::Library),
            "populate" => return Ok(Pipeline::Populate),
            _ => {}
        }
        if let Ok(kind) = s.parse::<AssociationKind>() {
            return Ok(Pipeline::Relation {
                kind,
                delete: false,
            });
        }
        CatalogField::from_name(s).map(Pipeline::Property).ok_or_else(|| {
            format!(
                "Unknown pipeline: '{}'. Use library, populate, an association kind or a field name",
                s
            )
        })
    }
}

/// Run-wide switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Compute the summary, then roll back
    pub dry_run: bool,
    pub mode: Mode,
}

/// State of one import run: the running tally and the label cache
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub summary: ImportSummary,
    pub resolver: ReferenceResolver,
}

impl ImportBatch {
    /// Normalized key of a row; an empty key marks the row invalid
    fn row_key(&mut self, row: &Row) -> Option<String> {
        self.summary.rows_processed += 1;
        let key = normalize_key(row.cell(0));
        if key.is_none() {
            warn!(line = row.line, "row has no latin name");
            self.summary
                .invalid
                .push(RowIssue::new(row.line, "", "latin name is empty"));
        }
        key
    }

    /// Normalize then resolve the given columns of a row.
    ///
    /// Returns `None` when a cell cannot be used, after recording the row as
    /// invalid. Unrecognized yes/no cells are recorded and read as "no".
    /// Reference labels are only resolved once every cell normalized, so an
    /// invalid row never creates reference values.
    fn normalize_row<R: CatalogRepository>(
        &mut self,
        repo: &mut R,
        row: &Row,
        key: &str,
        columns: &[(usize, CatalogField)],
    ) -> Result<Option<Vec<(CatalogField, FieldValue)>>, ImportError> {
        let mut cells = Vec::with_capacity(columns.len());
        for &(index, field) in columns {
            let raw = row.cell(index);
            match normalize_cell(field, raw) {
                Normalized::Value(cell) => cells.push((field, cell)),
                Normalized::Unrecognized(value) if field.is_boolean() => {
                    warn!(
                        line = row.line,
                        key,
                        field = %field,
                        value = %value,
                        "unrecognized yes/no value, using no"
                    );
                    self.summary.unrecognized.push(RowIssue::new(
                        row.line,
                        key,
                        format!("{}: '{}' read as no", field, value),
                    ));
                    cells.push((field, CellValue::Bool(false)));
                }
                Normalized::Unrecognized(value) => {
                    warn!(
                        line = row.line,
                        key,
                        field = %field,
                        value = %value,
                        "unrecognized value, row skipped"
                    );
                    self.summary.invalid.push(RowIssue::new(
                        row.line,
                        key,
                        format!("{}: '{}' is not a valid {}", field, value, field.kind().label()),
                    ));
                    return Ok(None);
                }
            }
        }

        let mut changes = Vec::with_capacity(cells.len());
        for (field, cell) in cells {
            if let Some(value) = self.resolver.resolve_cell(repo, field, cell)? {
                changes.push((field, value));
            }
        }
        Ok(Some(changes))
    }

    /// Apply changes to an existing entry, writing only if something differs
    fn apply_changes<R: CatalogRepository>(
        &mut self,
        repo: &mut R,
        line: usize,
        mut entry: CatalogEntry,
        changes: Vec<(CatalogField, FieldValue)>,
    ) -> Result<(), ImportError> {
        let mut changed = false;
        for (field, value) in changes {
            changed |= entry.set(field, value);
        }
        if !changed {
            self.summary.unchanged += 1;
            return Ok(());
        }
        match repo.upsert(&entry) {
            Ok(_) => {
                debug!(line, key = %entry.latin_name, "updated entry");
                self.summary.updated += 1;
                Ok(())
            }
            Err(e) => self.record_write_error(line, &entry.latin_name, e),
        }
    }

    /// Record a per-row storage failure, or propagate it if it is not per-row
    fn record_write_error(
        &mut self,
        line: usize,
        key: &str,
        error: StoreError,
    ) -> Result<(), ImportError> {
        warn!(line, key, error = %error, "row rejected");
        match error {
            StoreError::Invariant(reason) => {
                self.summary.invalid.push(RowIssue::new(line, key, reason));
                Ok(())
            }
            StoreError::Constraint(reason) => {
                self.summary.integrity.push(RowIssue::new(line, key, reason));
                Ok(())
            }
            other => Err(other.into()),
        }
    }

    /// Record a key that is not in the catalog
    fn not_found(&mut self, line: usize, key: String) {
        warn!(line, key = %key, "latin name not in catalog");
        self.summary.not_found.push(key);
    }
}

/// Import one file
pub fn import_file<R: CatalogRepository>(
    repo: &mut R,
    path: &Path,
    pipeline: Pipeline,
    options: ImportOptions,
) -> Result<ImportSummary, ImportError> {
    info!(path = %path.display(), pipeline = %pipeline, "importing");
    let table = read_table(path)?;
    import_table(repo, &table, pipeline, options)
}

/// Import an already parsed table
pub fn import_table<R: CatalogRepository>(
    repo: &mut R,
    table: &Table,
    pipeline: Pipeline,
    options: ImportOptions,
) -> Result<ImportSummary, ImportError> {
    if pipeline == Pipeline::Populate && options.mode == Mode::Production {
        return Err(ImportError::ProductionMode);
    }

    match pipeline {
        Pipeline::Property(field) => property::check_header(table, field)?,
        Pipeline::Library => library::check_header(table)?,
        Pipeline::Relation { .. } | Pipeline::Populate => {}
    }
    let relation_headers = match pipeline {
        Pipeline::Relation { kind, .. } => relation::parse_headers(table, kind)?,
        _ => Vec::new(),
    };
    let populate_fields = match pipeline {
        Pipeline::Populate => populate::parse_headers(table)?,
        _ => Vec::new(),
    };

    if pipeline.requires_unique_keys() {
        check_duplicates(table)?;
    }

    let mut batch = ImportBatch::default();
    repo.begin()?;
    let result = match pipeline {
        Pipeline::Property(field) => property::apply(repo, table, field, &mut batch),
        Pipeline::Library => library::apply(repo, table, &mut batch),
        Pipeline::Relation { kind, delete } => {
            relation::apply(repo, table, kind, &relation_headers, delete, &mut batch)
        }
        Pipeline::Populate => populate::apply(repo, table, &populate_fields, &mut batch),
    };

    match result {
        Ok(()) if options.dry_run => {
            repo.rollback()?;
            info!(path = %table.path.display(), "dry run, changes rolled back");
        }
        Ok(()) => repo.commit()?,
        Err(e) => {
            if let Err(rollback) = repo.rollback() {
                warn!(error = %rollback, "rollback failed");
            }
            return Err(e);
        }
    }

    let mut summary = batch.summary;
    summary.references_created = batch.resolver.created().to_vec();
    summary.dry_run = options.dry_run;
    Ok(summary)
}

/// Reject a file whose rows repeat a Latin name, ignoring case
fn check_duplicates(table: &Table) -> Result<(), ImportError> {
    let keys: Vec<(usize, String)> = table
        .rows
        .iter()
        .filter_map(|row| normalize_key(row.cell(0)).map(|key| (row.line, key)))
        .collect();
    let duplicates = find_duplicates(keys.iter().map(|(line, key)| (*line, key.as_str())));
    if duplicates.is_empty() {
        return Ok(());
    }
    let keys = duplicates
        .iter()
        .map(|d| {
            let lines: Vec<String> = d.lines.iter().map(|l| l.to_string()).collect();
            format!("{} (lines {})", d.key, lines.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ImportError::DuplicateKeys {
        count: duplicates.len(),
        keys,
    })
}

/// Result of one file in a directory import
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<ImportSummary, ImportError>,
}

/// Importable files directly inside `dir`, in name order
pub fn importable_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| SourceFormat::detect(p).is_some())
        .collect();
    Ok(files)
}

/// Import every CSV or spreadsheet file in a directory, one transaction each.
///
/// A file that fails is reported and the run moves on to the next file.
pub fn import_directory<R: CatalogRepository>(
    repo: &mut R,
    dir: &Path,
    pipeline: Pipeline,
    options: ImportOptions,
) -> Result<Vec<FileReport>, ImportError> {
    let files = importable_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no CSV or spreadsheet files found");
    }

    let mut reports = Vec::with_capacity(files.len());
    // --delete clears the relation once, with the first file that imports
    let mut pending_delete = matches!(pipeline, Pipeline::Relation { delete: true, .. });
    for path in files {
        let pipeline = match pipeline {
            Pipeline::Relation { kind, .. } => Pipeline::Relation {
                kind,
                delete: pending_delete,
            },
            other => other,
        };
        let result = import_file(repo, &path, pipeline, options);
        match &result {
            Ok(_) => pending_delete = false,
            Err(e) => warn!(path = %path.display(), error = %e, "file not imported"),
        }
        reports.push(FileReport { path, result });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::ReferenceTable;
    use crate::core::memory::MemoryCatalog;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) fn table(text: &str) -> Table {
        source::parse_csv(text.as_bytes(), Path::new("test.csv")).unwrap()
    }

    pub(crate) fn run(
        repo: &mut MemoryCatalog,
        text: &str,
        pipeline: Pipeline,
    ) -> Result<ImportSummary, ImportError> {
        import_table(repo, &table(text), pipeline, ImportOptions::default())
    }

    #[test]
    fn test_pipeline_parse() {
        assert_eq!("library".parse::<Pipeline>().unwrap(), Pipeline::Library);
        assert_eq!(
            "bee".parse::<Pipeline>().unwrap(),
            Pipeline::Relation {
                kind: AssociationKind::Bee,
                delete: false
            }
        );
        assert_eq!(
            "full-sun".parse::<Pipeline>().unwrap(),
            Pipeline::Property(CatalogField::FullSun)
        );
        assert!("nonsense".parse::<Pipeline>().is_err());
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            Pipeline::Property(CatalogField::DroughtTolerant).template(),
            "latin_name,drought_tolerant"
        );
        assert!(Pipeline::Library.template().starts_with("latin_name,sharing_priority,"));
        assert!(Pipeline::Populate.template().ends_with(",seed_library"));
    }

    #[test]
    fn test_dry_run_rolls_back() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let options = ImportOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = import_table(
            &mut repo,
            &table("latin_name,color\nAcer rubrum,Red\n"),
            Pipeline::Property(CatalogField::Color),
            options,
        )
        .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.references_created.len(), 1);

        let entry = repo.find_by_key("Acer rubrum").unwrap().unwrap();
        assert_eq!(entry.get(CatalogField::Color), FieldValue::Null);
        assert!(repo.references(ReferenceTable::Color).unwrap().is_empty());
    }

    #[test]
    fn test_populate_refused_in_production() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let options = ImportOptions {
            dry_run: false,
            mode: Mode::Production,
        };
        let err = import_table(
            &mut repo,
            &table("latin_name,full_sun\nQuercus alba,yes\n"),
            Pipeline::Populate,
            options,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::ProductionMode));
        assert!(repo.find_by_key("Acer rubrum").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_keys_abort_library_import() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let mut text = library::expected_header().join(",");
        text.push('\n');
        for key in ["Acer rubrum", "acer RUBRUM"] {
            text.push_str(key);
            text.push_str(&",".repeat(library::LIBRARY_FIELDS.len()));
            text.push('\n');
        }
        let err = run(&mut repo, &text, Pipeline::Library).unwrap_err();
        match err {
            ImportError::DuplicateKeys { count, keys } => {
                assert_eq!(count, 1);
                assert!(keys.contains("lines 2, 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_import_processes_files_in_order() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("b.csv"),
            "latin_name,full_sun\nAcer rubrum,no\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "latin_name,full_sun\nAcer rubrum,yes\n",
        )
        .unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let reports = import_directory(
            &mut repo,
            tmp.path(),
            Pipeline::Property(CatalogField::FullSun),
            ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].path.ends_with("a.csv"));
        let entry = repo.find_by_key("Acer rubrum").unwrap().unwrap();
        assert_eq!(entry.get(CatalogField::FullSun), FieldValue::Bool(false));
    }

    #[test]
    fn test_directory_import_continues_after_bad_file() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.csv"), "latin,full_sun\nAcer rubrum,yes\n").unwrap();
        fs::write(
            tmp.path().join("b.csv"),
            "latin_name,full_sun\nAcer rubrum,yes\n",
        )
        .unwrap();

        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        let reports = import_directory(
            &mut repo,
            tmp.path(),
            Pipeline::Property(CatalogField::FullSun),
            ImportOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            reports[0].result,
            Err(ImportError::HeaderMismatch { .. })
        ));
        assert_eq!(reports[1].result.as_ref().unwrap().updated, 1);
    }

    #[test]
    fn test_directory_delete_waits_for_first_good_file() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "latin,bee-Bombus impatiens\nMonarda fistulosa,yes\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("b.csv"),
            "latin_name,bee-Bombus impatiens\nMonarda fistulosa,yes\n",
        )
        .unwrap();

        let mut repo = MemoryCatalog::new();
        let monarda = repo.add_entry("Monarda fistulosa").unwrap();
        let (honey_bee, _) = repo
            .get_or_create_species(AssociationKind::Bee, "Apis mellifera", None)
            .unwrap();
        repo.set_association(AssociationKind::Bee, monarda.id, honey_bee.id, true)
            .unwrap();

        let reports = import_directory(
            &mut repo,
            tmp.path(),
            Pipeline::Relation {
                kind: AssociationKind::Bee,
                delete: true,
            },
            ImportOptions::default(),
        )
        .unwrap();

        assert!(reports[0].result.is_err());
        assert_eq!(reports[1].result.as_ref().unwrap().associations_removed, 1);
        assert_eq!(
            repo.associations(AssociationKind::Bee, monarda.id).unwrap(),
            vec!["Bombus impatiens".to_string()]
        );
    }

    #[test]
    fn test_directory_must_exist() {
        let mut repo = MemoryCatalog::new();
        let err = import_directory(
            &mut repo,
            Path::new("/nonexistent/seedcat"),
            Pipeline::Library,
            ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::NotADirectory { .. }));
    }
}
