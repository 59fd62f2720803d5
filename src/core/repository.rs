//! Persistence interface for the catalog
//!
//! Import and query code only talk to [`CatalogRepository`]. The SQLite
//! store implements it for real runs; [`MemoryCatalog`](crate::core::MemoryCatalog)
//! implements it for tests.

use std::collections::HashSet;

use thiserror::Error;

use crate::core::entry::{AssociationKind, CatalogEntry, ReferenceValue, Species};
use crate::core::field::ReferenceTable;
use crate::core::query::CatalogFilter;

/// Errors raised by catalog storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("catalog database has schema version {found}, this build expects {expected}")]
    SchemaVersion { found: i32, expected: i32 },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("{0}")]
    Invariant(String),

    #[error("{table} '{label}' is still used by {count} catalog entries")]
    ReferenceInUse {
        table: ReferenceTable,
        label: String,
        count: usize,
    },

    #[error("transaction error: {0}")]
    Transaction(String),
}

impl StoreError {
    /// Per-row integrity failures that an import records and moves past
    pub fn is_integrity(&self) -> bool {
        matches!(self, StoreError::Constraint(_) | StoreError::Invariant(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Catalog storage operations used by the import pipeline and queries
pub trait CatalogRepository {
    /// Find an entry by Latin name (case-insensitive)
    fn find_by_key(&self, latin_name: &str) -> StoreResult<Option<CatalogEntry>>;

    /// Lower-cased Latin names of every entry
    fn keys(&self) -> StoreResult<HashSet<String>>;

    /// All entries ordered by Latin name
    fn entries(&self) -> StoreResult<Vec<CatalogEntry>>;

    /// Insert a new entry or overwrite the entry with the same Latin name.
    /// Returns the stored entry with its id and timestamp.
    fn upsert(&mut self, entry: &CatalogEntry) -> StoreResult<CatalogEntry>;

    fn find_reference(
        &self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<Option<ReferenceValue>>;

    /// Fetch a reference row by label, creating it when absent.
    /// The flag is true when the row was created by this call.
    fn get_or_create_reference(
        &mut self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<(ReferenceValue, bool)>;

    fn references(&self, table: ReferenceTable) -> StoreResult<Vec<ReferenceValue>>;

    /// Delete a reference label. Refused while any entry points at it.
    /// Returns false if the label does not exist.
    fn delete_reference(&mut self, table: ReferenceTable, label: &str) -> StoreResult<bool>;

    /// Fetch a species record, creating it when absent
    fn get_or_create_species(
        &mut self,
        kind: AssociationKind,
        latin_name: &str,
        english_name: Option<&str>,
    ) -> StoreResult<(Species, bool)>;

    /// Turn an association on or off. Returns true if anything changed.
    /// `target_id` is a species id, or an entry id for catalog-to-catalog kinds.
    fn set_association(
        &mut self,
        kind: AssociationKind,
        entry_id: i64,
        target_id: i64,
        on: bool,
    ) -> StoreResult<bool>;

    /// Latin names associated with an entry, sorted
    fn associations(&self, kind: AssociationKind, entry_id: i64) -> StoreResult<Vec<String>>;

    /// Remove every association of one kind, returning how many were removed
    fn clear_associations(&mut self, kind: AssociationKind) -> StoreResult<usize>;

    /// Empty the catalog: associations, entries, species, then reference tables
    fn clear_catalog(&mut self) -> StoreResult<()>;

    /// Entries matching a filter, ordered by Latin name
    fn search(&self, filter: &CatalogFilter) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }

    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;
}
