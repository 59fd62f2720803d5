//! In-memory catalog repository
//!
//! Behaves like the SQLite store (case-insensitive keys, restricted
//! reference deletion, snapshot transactions) without touching disk.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::entry::{AssociationKind, CatalogEntry, FieldValue, ReferenceValue, Species};
use crate::core::field::{CatalogField, ReferenceTable};
use crate::core::repository::{CatalogRepository, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct State {
    next_id: i64,
    /// Keyed by lower-cased Latin name
    entries: BTreeMap<String, CatalogEntry>,
    references: HashMap<ReferenceTable, Vec<ReferenceValue>>,
    species: Vec<Species>,
    associations: HashSet<(AssociationKind, i64, i64)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Catalog kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: State,
    snapshot: Option<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests: insert an entry with the given Latin name
    pub fn add_entry(&mut self, latin_name: &str) -> StoreResult<CatalogEntry> {
        self.upsert(&CatalogEntry::new(latin_name))
    }

    fn reference_use_count(&self, value: &ReferenceValue) -> usize {
        let fields: Vec<CatalogField> = CatalogField::referencing(value.table).collect();
        self.state
            .entries
            .values()
            .filter(|e| {
                fields
                    .iter()
                    .any(|f| matches!(e.get(*f), FieldValue::Reference(ref r) if r.id == value.id))
            })
            .count()
    }

    fn latin_name_of(&self, kind: AssociationKind, target_id: i64) -> Option<String> {
        if kind.targets_catalog() {
            self.state
                .entries
                .values()
                .find(|e| e.id == target_id)
                .map(|e| e.latin_name.clone())
        } else {
            self.state
                .species
                .iter()
                .find(|s| s.id == target_id)
                .map(|s| s.latin_name.clone())
        }
    }
}

impl CatalogRepository for MemoryCatalog {
    fn find_by_key(&self, latin_name: &str) -> StoreResult<Option<CatalogEntry>> {
        Ok(self
            .state
            .entries
            .get(&latin_name.trim().to_lowercase())
            .cloned())
    }

    fn keys(&self) -> StoreResult<HashSet<String>> {
        Ok(self.state.entries.keys().cloned().collect())
    }

    fn entries(&self) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self.state.entries.values().cloned().collect())
    }

    fn upsert(&mut self, entry: &CatalogEntry) -> StoreResult<CatalogEntry> {
        entry.check_invariants().map_err(StoreError::Invariant)?;
        let key = entry.latin_name.trim().to_lowercase();
        let mut stored = entry.clone();
        stored.id = match self.state.entries.get(&key) {
            Some(existing) => existing.id,
            None => self.state.next_id(),
        };
        stored.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self.state.entries.insert(key, stored.clone());
        Ok(stored)
    }

    fn find_reference(
        &self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<Option<ReferenceValue>> {
        Ok(self
            .state
            .references
            .get(&table)
            .and_then(|values| values.iter().find(|v| v.label == label))
            .cloned())
    }

    fn get_or_create_reference(
        &mut self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<(ReferenceValue, bool)> {
        if let Some(existing) = self.find_reference(table, label)? {
            return Ok((existing, false));
        }
        let value = ReferenceValue {
            table,
            id: self.state.next_id(),
            label: label.to_string(),
        };
        self.state
            .references
            .entry(table)
            .or_default()
            .push(value.clone());
        Ok((value, true))
    }

    fn references(&self, table: ReferenceTable) -> StoreResult<Vec<ReferenceValue>> {
        let mut values = self.state.references.get(&table).cloned().unwrap_or_default();
        values.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(values)
    }

    fn delete_reference(&mut self, table: ReferenceTable, label: &str) -> StoreResult<bool> {
        let Some(value) = self.find_reference(table, label)? else {
            return Ok(false);
        };
        let count = self.reference_use_count(&value);
        if count > 0 {
            return Err(StoreError::ReferenceInUse {
                table,
                label: label.to_string(),
                count,
            });
        }
        if let Some(values) = self.state.references.get_mut(&table) {
            values.retain(|v| v.id != value.id);
        }
        Ok(true)
    }

    fn get_or_create_species(
        &mut self,
        kind: AssociationKind,
        latin_name: &str,
        english_name: Option<&str>,
    ) -> StoreResult<(Species, bool)> {
        let wanted = latin_name.to_lowercase();
        if let Some(existing) = self
            .state
            .species
            .iter()
            .find(|s| s.kind == kind && s.latin_name.to_lowercase() == wanted)
        {
            return Ok((existing.clone(), false));
        }
        let species = Species {
            id: self.state.next_id(),
            kind,
            latin_name: latin_name.to_string(),
            english_name: english_name.map(String::from),
        };
        self.state.species.push(species.clone());
        Ok((species, true))
    }

    fn set_association(
        &mut self,
        kind: AssociationKind,
        entry_id: i64,
        target_id: i64,
        on: bool,
    ) -> StoreResult<bool> {
        let key = (kind, entry_id, target_id);
        Ok(if on {
            self.state.associations.insert(key)
        } else {
            self.state.associations.remove(&key)
        })
    }

    fn associations(&self, kind: AssociationKind, entry_id: i64) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .state
            .associations
            .iter()
            .filter(|(k, e, _)| *k == kind && *e == entry_id)
            .filter_map(|(k, _, t)| self.latin_name_of(*k, *t))
            .collect();
        names.sort();
        Ok(names)
    }

    fn clear_associations(&mut self, kind: AssociationKind) -> StoreResult<usize> {
        let before = self.state.associations.len();
        self.state.associations.retain(|(k, _, _)| *k != kind);
        Ok(before - self.state.associations.len())
    }

    fn clear_catalog(&mut self) -> StoreResult<()> {
        self.state.associations.clear();
        self.state.entries.clear();
        self.state.species.clear();
        self.state.references.clear();
        Ok(())
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction(
                "a transaction is already open".to_string(),
            ));
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("no open transaction".to_string()))
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::Transaction("no open transaction".to_string()))?;
        self.state = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        assert!(repo.find_by_key("acer RUBRUM").unwrap().is_some());
        assert!(repo.keys().unwrap().contains("acer rubrum"));
    }

    #[test]
    fn test_reference_delete_is_restricted() {
        let mut repo = MemoryCatalog::new();
        let (red, _) = repo
            .get_or_create_reference(ReferenceTable::Color, "Red")
            .unwrap();
        let mut entry = CatalogEntry::new("Acer rubrum");
        entry.set(CatalogField::Color, FieldValue::Reference(red));
        repo.upsert(&entry).unwrap();

        let err = repo
            .delete_reference(ReferenceTable::Color, "Red")
            .unwrap_err();
        assert!(matches!(err, StoreError::ReferenceInUse { count: 1, .. }));

        repo.get_or_create_reference(ReferenceTable::Color, "Blue")
            .unwrap();
        assert!(repo.delete_reference(ReferenceTable::Color, "Blue").unwrap());
        assert!(!repo.delete_reference(ReferenceTable::Color, "Blue").unwrap());
    }

    #[test]
    fn test_rollback_restores_state() {
        let mut repo = MemoryCatalog::new();
        repo.add_entry("Acer rubrum").unwrap();
        repo.begin().unwrap();
        repo.add_entry("Asclepias syriaca").unwrap();
        repo.rollback().unwrap();
        assert_eq!(repo.entries().unwrap().len(), 1);
        assert!(repo.commit().is_err());
    }

    #[test]
    fn test_upsert_rejects_inverted_heights() {
        let mut repo = MemoryCatalog::new();
        let mut entry = CatalogEntry::new("Acer rubrum");
        entry.set(CatalogField::HeightMin, FieldValue::Decimal(20.0));
        entry.set(CatalogField::HeightMax, FieldValue::Decimal(10.0));
        let err = repo.upsert(&entry).unwrap_err();
        assert!(err.is_integrity());
    }
}
