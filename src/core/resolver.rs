//! Reference-table resolution for imported labels

use std::collections::HashMap;

use tracing::warn;

use crate::core::entry::{FieldValue, ReferenceValue};
use crate::core::field::{CatalogField, ReferenceTable};
use crate::core::normalize::CellValue;
use crate::core::repository::{CatalogRepository, StoreResult};

/// Resolves labels to reference rows, creating missing rows on the way.
///
/// Lives for one import run; remembers what it resolved so each label hits
/// storage once, and records every label it had to create.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    resolved: HashMap<(ReferenceTable, String), ReferenceValue>,
    created: Vec<ReferenceValue>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the row for `label`, creating it if absent
    pub fn resolve<R: CatalogRepository>(
        &mut self,
        repo: &mut R,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<ReferenceValue> {
        let key = (table, label.to_string());
        if let Some(value) = self.resolved.get(&key) {
            return Ok(value.clone());
        }

        let (value, created) = repo.get_or_create_reference(table, label)?;
        if created {
            warn!(table = %table, label = %label, "created missing reference value");
            self.created.push(value.clone());
        }
        self.resolved.insert(key, value.clone());
        Ok(value)
    }

    /// Turn a normalized cell into the value stored for `field`.
    ///
    /// Labels are resolved before the caller compares or writes anything.
    /// Returns `None` when the cell asks to keep the current value.
    pub fn resolve_cell<R: CatalogRepository>(
        &mut self,
        repo: &mut R,
        field: CatalogField,
        cell: CellValue,
    ) -> StoreResult<Option<FieldValue>> {
        Ok(Some(match cell {
            CellValue::Keep => return Ok(None),
            CellValue::Null => FieldValue::Null,
            CellValue::Bool(b) => FieldValue::Bool(b),
            CellValue::Integer(v) => FieldValue::Integer(v),
            CellValue::Decimal(v) => FieldValue::Decimal(v),
            CellValue::Text(s) => FieldValue::Text(s),
            CellValue::Label(label) => match field.reference_table() {
                Some(table) => FieldValue::Reference(self.resolve(repo, table, &label)?),
                None => FieldValue::Text(label),
            },
        }))
    }

    /// Reference rows created during this run, in creation order
    pub fn created(&self) -> &[ReferenceValue] {
        &self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryCatalog;

    #[test]
    fn test_resolve_same_label_twice_returns_same_row() {
        let mut repo = MemoryCatalog::new();
        let mut resolver = ReferenceResolver::new();
        let first = resolver
            .resolve(&mut repo, ReferenceTable::HarvestingIndicator, "Pods split")
            .unwrap();
        let second = resolver
            .resolve(&mut repo, ReferenceTable::HarvestingIndicator, "Pods split")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.created().len(), 1);
        assert_eq!(
            repo.references(ReferenceTable::HarvestingIndicator)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_existing_label_is_not_reported_as_created() {
        let mut repo = MemoryCatalog::new();
        repo.get_or_create_reference(ReferenceTable::SeedHead, "Capsule")
            .unwrap();
        let mut resolver = ReferenceResolver::new();
        resolver
            .resolve(&mut repo, ReferenceTable::SeedHead, "Capsule")
            .unwrap();
        assert!(resolver.created().is_empty());
    }

    #[test]
    fn test_resolve_cell() {
        let mut repo = MemoryCatalog::new();
        let mut resolver = ReferenceResolver::new();
        let value = resolver
            .resolve_cell(
                &mut repo,
                CatalogField::SeedStorage,
                CellValue::Label("Fridge".to_string()),
            )
            .unwrap()
            .unwrap();
        assert_eq!(value.as_text(), Some("Fridge"));
        assert!(resolver
            .resolve_cell(&mut repo, CatalogField::SeedStorage, CellValue::Keep)
            .unwrap()
            .is_none());
        assert_eq!(
            resolver
                .resolve_cell(&mut repo, CatalogField::FullSun, CellValue::Bool(true))
                .unwrap(),
            Some(FieldValue::Bool(true))
        );
    }
}
