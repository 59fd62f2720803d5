//! Per-run import accounting

use crate::core::entry::ReferenceValue;

/// A row that was not written, or was written with a coerced value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub line: usize,
    pub key: String,
    pub reason: String,
}

impl RowIssue {
    pub fn new(line: usize, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of importing one file (or, after [`merge`](Self::merge), several)
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub rows_processed: usize,
    /// Entries inserted (populate)
    pub created: usize,
    /// Entries or relations written because something differed
    pub updated: usize,
    /// Rows whose values already matched the catalog
    pub unchanged: usize,
    /// Latin names that are not in the catalog
    pub not_found: Vec<String>,
    /// Rows skipped because a value could not be used
    pub invalid: Vec<RowIssue>,
    /// Rows rejected by a storage constraint
    pub integrity: Vec<RowIssue>,
    /// Relation rows skipped whole because a related entry is missing
    pub skipped: Vec<RowIssue>,
    /// Cells that were not a recognised yes/no and were read as "no"
    pub unrecognized: Vec<RowIssue>,
    /// Reference labels created during the run
    pub references_created: Vec<ReferenceValue>,
    pub species_created: usize,
    /// Associations removed up front by `--delete`
    pub associations_removed: usize,
    /// Nothing was committed
    pub dry_run: bool,
}

impl ImportSummary {
    /// Rows that did not make it into the catalog
    pub fn problem_count(&self) -> usize {
        self.not_found.len() + self.invalid.len() + self.integrity.len() + self.skipped.len()
    }

    pub fn merge(&mut self, other: &ImportSummary) {
        self.rows_processed += other.rows_processed;
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.not_found.extend(other.not_found.iter().cloned());
        self.invalid.extend(other.invalid.iter().cloned());
        self.integrity.extend(other.integrity.iter().cloned());
        self.skipped.extend(other.skipped.iter().cloned());
        self.unrecognized.extend(other.unrecognized.iter().cloned());
        self.references_created
            .extend(other.references_created.iter().cloned());
        self.species_created += other.species_created;
        self.associations_removed += other.associations_removed;
        self.dry_run |= other.dry_run;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counts_and_lists() {
        let mut total = ImportSummary {
            rows_processed: 2,
            updated: 1,
            not_found: vec!["Quercus alba".to_string()],
            ..Default::default()
        };
        let other = ImportSummary {
            rows_processed: 3,
            updated: 2,
            invalid: vec![RowIssue::new(4, "Acer rubrum", "bad height")],
            ..Default::default()
        };
        total.merge(&other);
        assert_eq!(total.rows_processed, 5);
        assert_eq!(total.updated, 3);
        assert_eq!(total.problem_count(), 2);
    }
}
