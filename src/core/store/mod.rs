//! SQLite-backed catalog store
//!
//! This module provides the persistent catalog used by the CLI:
//! - One `catalog_entries` table with a column per [`CatalogField`]
//! - One `ref_<name>` label table per [`ReferenceTable`]
//! - Species records and association rows for relation imports
//!
//! The schema is generated from the field table and versioned. Unlike a
//! cache, the catalog is primary data: a version mismatch is an error,
//! never a silent rebuild.

mod queries;
mod schema;

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::core::entry::{AssociationKind, CatalogEntry, ReferenceValue, Species};
use crate::core::field::{CatalogField, ReferenceTable};
use crate::core::query::CatalogFilter;
use crate::core::repository::{CatalogRepository, StoreError, StoreResult};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// The catalog backed by SQLite
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open or create the catalog database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Open a throwaway catalog that lives only as long as the value
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let catalog = Self { conn };

        let version = catalog.schema_version();
        if version == 0 {
            catalog.init_schema()?;
        } else if version != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(catalog)
    }

    /// Version recorded in the database, 0 for a fresh file
    fn schema_version(&self) -> i32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    fn reference_by_label(
        &self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<Option<ReferenceValue>> {
        let sql = format!("SELECT id, label FROM {} WHERE label = ?1", table.sql_table());
        Ok(self
            .conn
            .query_row(&sql, params![label], |row| {
                Ok(ReferenceValue {
                    table,
                    id: row.get(0)?,
                    label: row.get(1)?,
                })
            })
            .optional()?)
    }
}

/// Turn constraint failures into per-row integrity errors
fn map_write_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, ref message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Constraint(message.clone().unwrap_or_else(|| failure.to_string()))
        }
        other => StoreError::Sqlite(other),
    }
}

impl CatalogRepository for SqliteCatalog {
    fn find_by_key(&self, latin_name: &str) -> StoreResult<Option<CatalogEntry>> {
        let sql = format!("{} WHERE e.latin_name = ?1", queries::select_sql());
        Ok(self
            .conn
            .query_row(&sql, params![latin_name.trim()], queries::decode_row)
            .optional()?)
    }

    fn keys(&self) -> StoreResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT latin_name FROM catalog_entries")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for name in rows {
            keys.insert(name?.to_lowercase());
        }
        Ok(keys)
    }

    fn entries(&self) -> StoreResult<Vec<CatalogEntry>> {
        self.search(&CatalogFilter::default())
    }

    fn upsert(&mut self, entry: &CatalogEntry) -> StoreResult<CatalogEntry> {
        entry.check_invariants().map_err(StoreError::Invariant)?;

        let latin_name = entry.latin_name.trim();
        let now = chrono::Utc::now().to_rfc3339();
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM catalog_entries WHERE latin_name = ?1",
                params![latin_name],
                |row| row.get(0),
            )
            .optional()?;

        let mut values = vec![rusqlite::types::Value::Text(latin_name.to_string())];
        values.extend(
            CatalogField::ALL
                .iter()
                .map(|f| queries::to_sql_value(&entry.get(*f))),
        );
        values.push(rusqlite::types::Value::Text(now));

        let sql = match existing {
            Some(id) => {
                values.push(rusqlite::types::Value::Integer(id));
                queries::update_sql()
            }
            None => queries::insert_sql(),
        };

        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))
            .map_err(map_write_error)?;

        self.find_by_key(latin_name)?.ok_or_else(|| {
            StoreError::Transaction(format!("entry '{}' vanished after write", latin_name))
        })
    }

    fn find_reference(
        &self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<Option<ReferenceValue>> {
        self.reference_by_label(table, label)
    }

    fn get_or_create_reference(
        &mut self,
        table: ReferenceTable,
        label: &str,
    ) -> StoreResult<(ReferenceValue, bool)> {
        if let Some(existing) = self.reference_by_label(table, label)? {
            return Ok((existing, false));
        }
        let sql = format!("INSERT INTO {} (label) VALUES (?1)", table.sql_table());
        self.conn
            .execute(&sql, params![label])
            .map_err(map_write_error)?;
        Ok((
            ReferenceValue {
                table,
                id: self.conn.last_insert_rowid(),
                label: label.to_string(),
            },
            true,
        ))
    }

    fn references(&self, table: ReferenceTable) -> StoreResult<Vec<ReferenceValue>> {
        let sql = format!("SELECT id, label FROM {} ORDER BY label", table.sql_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ReferenceValue {
                table,
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_reference(&mut self, table: ReferenceTable, label: &str) -> StoreResult<bool> {
        let Some(value) = self.reference_by_label(table, label)? else {
            return Ok(false);
        };

        let mut count = 0usize;
        for field in CatalogField::referencing(table) {
            let sql = format!(
                "SELECT COUNT(*) FROM catalog_entries WHERE {} = ?1",
                field.name()
            );
            let n: i64 = self.conn.query_row(&sql, params![value.id], |row| row.get(0))?;
            count += n as usize;
        }
        if count > 0 {
            return Err(StoreError::ReferenceInUse {
                table,
                label: label.to_string(),
                count,
            });
        }

        let sql = format!("DELETE FROM {} WHERE id = ?1", table.sql_table());
        self.conn
            .execute(&sql, params![value.id])
            .map_err(map_write_error)?;
        Ok(true)
    }

    fn get_or_create_species(
        &mut self,
        kind: AssociationKind,
        latin_name: &str,
        english_name: Option<&str>,
    ) -> StoreResult<(Species, bool)> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, latin_name, english_name FROM species WHERE kind = ?1 AND latin_name = ?2",
                params![kind.as_str(), latin_name],
                |row| {
                    Ok(Species {
                        id: row.get(0)?,
                        kind,
                        latin_name: row.get(1)?,
                        english_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if let Some(species) = existing {
            return Ok((species, false));
        }

        self.conn
            .execute(
                "INSERT INTO species (kind, latin_name, english_name) VALUES (?1, ?2, ?3)",
                params![kind.as_str(), latin_name, english_name],
            )
            .map_err(map_write_error)?;
        Ok((
            Species {
                id: self.conn.last_insert_rowid(),
                kind,
                latin_name: latin_name.to_string(),
                english_name: english_name.map(String::from),
            },
            true,
        ))
    }

    fn set_association(
        &mut self,
        kind: AssociationKind,
        entry_id: i64,
        target_id: i64,
        on: bool,
    ) -> StoreResult<bool> {
        let sql = if on {
            "INSERT OR IGNORE INTO associations (kind, entry_id, target_id) VALUES (?1, ?2, ?3)"
        } else {
            "DELETE FROM associations WHERE kind = ?1 AND entry_id = ?2 AND target_id = ?3"
        };
        let changed = self
            .conn
            .execute(sql, params![kind.as_str(), entry_id, target_id])
            .map_err(map_write_error)?;
        Ok(changed > 0)
    }

    fn associations(&self, kind: AssociationKind, entry_id: i64) -> StoreResult<Vec<String>> {
        let sql = if kind.targets_catalog() {
            r#"SELECT c.latin_name FROM associations a
               JOIN catalog_entries c ON c.id = a.target_id
               WHERE a.kind = ?1 AND a.entry_id = ?2
               ORDER BY c.latin_name"#
        } else {
            r#"SELECT s.latin_name FROM associations a
               JOIN species s ON s.id = a.target_id
               WHERE a.kind = ?1 AND a.entry_id = ?2
               ORDER BY s.latin_name"#
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![kind.as_str(), entry_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    fn clear_associations(&mut self, kind: AssociationKind) -> StoreResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM associations WHERE kind = ?1",
            params![kind.as_str()],
        )?)
    }

    fn clear_catalog(&mut self) -> StoreResult<()> {
        // Referencing tables go first so RESTRICT never fires
        let mut sql = String::from(
            "DELETE FROM associations;\nDELETE FROM catalog_entries;\nDELETE FROM species;\n",
        );
        for table in ReferenceTable::ALL {
            sql.push_str(&format!("DELETE FROM {};\n", table.sql_table()));
        }
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn search(&self, filter: &CatalogFilter) -> StoreResult<Vec<CatalogEntry>> {
        let (condition, values) = filter.to_sql();
        let sql = format!(
            "{} WHERE {} ORDER BY e.latin_name",
            queries::select_sql(),
            condition
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), queries::decode_row)?;
        let mut entries = rows.collect::<Result<Vec<_>, _>>()?;
        if !filter.exact_in_sql() {
            entries.retain(|e| filter.matches(e));
        }
        Ok(entries)
    }

    fn begin(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::FieldValue;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn catalog_with(names: &[&str]) -> SqliteCatalog {
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        for name in names {
            catalog.upsert(&CatalogEntry::new(*name)).unwrap();
        }
        catalog
    }

    #[test]
    fn test_open_creates_schema_and_reopens() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("catalog.db");
        {
            let mut catalog = SqliteCatalog::open(&path).unwrap();
            catalog.upsert(&CatalogEntry::new("Acer rubrum")).unwrap();
        }
        let catalog = SqliteCatalog::open(&path).unwrap();
        assert_eq!(catalog.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_schema_version_mismatch_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("catalog.db");
        SqliteCatalog::open(&path).unwrap();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("UPDATE schema_version SET version = 99", [])
                .unwrap();
        }
        let err = SqliteCatalog::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::SchemaVersion { found: 99, .. }));
    }

    #[test]
    fn test_upsert_round_trips_every_kind() {
        let mut catalog = catalog_with(&[]);
        let (storage, created) = catalog
            .get_or_create_reference(ReferenceTable::SeedStorage, "Cold, dry")
            .unwrap();
        assert!(created);

        let mut entry = CatalogEntry::new("Asclepias syriaca");
        entry.set(CatalogField::DroughtTolerant, FieldValue::Bool(true));
        entry.set(CatalogField::BloomStart, FieldValue::Integer(6));
        entry.set(CatalogField::HeightMax, FieldValue::Decimal(1.5));
        entry.set(
            CatalogField::EnglishName,
            FieldValue::Text("Common milkweed".to_string()),
        );
        entry.set(CatalogField::SeedStorage, FieldValue::Reference(storage));
        let stored = catalog.upsert(&entry).unwrap();
        assert!(stored.id > 0);
        assert!(stored.updated_at.is_some());

        let found = catalog.find_by_key("asclepias SYRIACA").unwrap().unwrap();
        assert_eq!(found.get(CatalogField::DroughtTolerant), FieldValue::Bool(true));
        assert_eq!(found.get(CatalogField::BloomStart), FieldValue::Integer(6));
        assert_eq!(found.get(CatalogField::BloomEnd), FieldValue::Integer(0));
        assert_eq!(found.get(CatalogField::HeightMax), FieldValue::Decimal(1.5));
        assert_eq!(found.get(CatalogField::HeightMin), FieldValue::Null);
        assert_eq!(
            found.get(CatalogField::SeedStorage).as_text(),
            Some("Cold, dry")
        );
        assert_eq!(found.english_name().as_deref(), Some("Common milkweed"));
    }

    #[test]
    fn test_upsert_updates_existing_entry() {
        let mut catalog = catalog_with(&["Acer rubrum"]);
        let mut entry = catalog.find_by_key("Acer rubrum").unwrap().unwrap();
        let id = entry.id;
        entry.set(CatalogField::FullSun, FieldValue::Bool(true));
        let stored = catalog.upsert(&entry).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(catalog.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_height_check_is_an_integrity_error() {
        let mut catalog = catalog_with(&[]);
        let mut entry = CatalogEntry::new("Acer rubrum");
        entry.set(CatalogField::HeightMin, FieldValue::Decimal(30.0));
        entry.set(CatalogField::HeightMax, FieldValue::Decimal(10.0));
        assert!(catalog.upsert(&entry).unwrap_err().is_integrity());
    }

    #[test]
    fn test_get_or_create_reference_is_idempotent() {
        let mut catalog = catalog_with(&[]);
        let (first, created_first) = catalog
            .get_or_create_reference(ReferenceTable::Lighting, "Full sun")
            .unwrap();
        let (second, created_second) = catalog
            .get_or_create_reference(ReferenceTable::Lighting, "Full sun")
            .unwrap();
        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first, second);
        assert_eq!(catalog.references(ReferenceTable::Lighting).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_reference_in_use_is_refused() {
        let mut catalog = catalog_with(&[]);
        let (red, _) = catalog
            .get_or_create_reference(ReferenceTable::Color, "Red")
            .unwrap();
        let mut entry = CatalogEntry::new("Acer rubrum");
        entry.set(CatalogField::Color, FieldValue::Reference(red));
        catalog.upsert(&entry).unwrap();

        assert!(matches!(
            catalog.delete_reference(ReferenceTable::Color, "Red"),
            Err(StoreError::ReferenceInUse { count: 1, .. })
        ));
        assert!(!catalog.delete_reference(ReferenceTable::Color, "Green").unwrap());
    }

    #[test]
    fn test_associations_toggle() {
        let mut catalog = catalog_with(&["Monarda fistulosa", "Echinacea purpurea"]);
        let monarda = catalog.find_by_key("Monarda fistulosa").unwrap().unwrap();
        let echinacea = catalog.find_by_key("Echinacea purpurea").unwrap().unwrap();
        let (bee, _) = catalog
            .get_or_create_species(AssociationKind::Bee, "Bombus impatiens", None)
            .unwrap();

        assert!(catalog
            .set_association(AssociationKind::Bee, monarda.id, bee.id, true)
            .unwrap());
        assert!(!catalog
            .set_association(AssociationKind::Bee, monarda.id, bee.id, true)
            .unwrap());
        catalog
            .set_association(AssociationKind::Companion, monarda.id, echinacea.id, true)
            .unwrap();

        assert_eq!(
            catalog.associations(AssociationKind::Bee, monarda.id).unwrap(),
            vec!["Bombus impatiens".to_string()]
        );
        assert_eq!(
            catalog
                .associations(AssociationKind::Companion, monarda.id)
                .unwrap(),
            vec!["Echinacea purpurea".to_string()]
        );
        assert_eq!(catalog.clear_associations(AssociationKind::Bee).unwrap(), 1);
        assert!(catalog
            .associations(AssociationKind::Bee, monarda.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_clear_catalog_empties_everything() {
        let mut catalog = catalog_with(&["Acer rubrum"]);
        let (red, _) = catalog
            .get_or_create_reference(ReferenceTable::Color, "Red")
            .unwrap();
        let mut entry = catalog.find_by_key("Acer rubrum").unwrap().unwrap();
        entry.set(CatalogField::Color, FieldValue::Reference(red));
        catalog.upsert(&entry).unwrap();

        catalog.clear_catalog().unwrap();
        assert!(catalog.entries().unwrap().is_empty());
        assert!(catalog.references(ReferenceTable::Color).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut catalog = catalog_with(&["Acer rubrum"]);
        catalog.begin().unwrap();
        catalog.upsert(&CatalogEntry::new("Asarum canadense")).unwrap();
        catalog.rollback().unwrap();
        assert_eq!(catalog.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_sql_search_agrees_with_in_memory_filter() {
        let mut catalog = catalog_with(&[]);
        let (purple, _) = catalog
            .get_or_create_reference(ReferenceTable::Color, "Purple")
            .unwrap();

        let mut monarda = CatalogEntry::new("Monarda fistulosa");
        monarda.set(CatalogField::FullSun, FieldValue::Bool(true));
        monarda.set(CatalogField::BloomStart, FieldValue::Integer(7));
        monarda.set(CatalogField::Color, FieldValue::Reference(purple));
        monarda.set(
            CatalogField::EnglishName,
            FieldValue::Text("Wild bergamot".to_string()),
        );
        monarda.set(
            CatalogField::FrenchName,
            FieldValue::Text("Monarde fistuleuse, bergamote sauvage d'été".to_string()),
        );
        catalog.upsert(&monarda).unwrap();

        let mut asarum = CatalogEntry::new("Asarum canadense");
        asarum.set(CatalogField::FullShade, FieldValue::Bool(true));
        catalog.upsert(&asarum).unwrap();

        let cases: Vec<Vec<(&str, &str)>> = vec![
            vec![("full_sun", "1")],
            vec![("full_sun", "")],
            vec![],
            vec![("name", "BERGAMOT")],
            vec![("bloom_start", "6"), ("color", "Purple")],
            vec![("color", "")],
            vec![("latin_name", "asarum"), ("full_shade", "yes")],
            vec![("name", "BERGAMOTE SAUVAGE")],
            vec![("french_name", "MONARDE FISTULEUSE")],
            vec![("name", "ÉTÉ")],
        ];
        let all = catalog.entries().unwrap();
        for case in cases {
            let params: BTreeMap<String, String> = case
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let filter = CatalogFilter::from_params(&params).unwrap();
            let from_sql: Vec<String> = catalog
                .search(&filter)
                .unwrap()
                .into_iter()
                .map(|e| e.latin_name)
                .collect();
            let in_memory: Vec<String> = all
                .iter()
                .filter(|e| filter.matches(e))
                .map(|e| e.latin_name.clone())
                .collect();
            assert_eq!(from_sql, in_memory, "{:?}", case);
        }

        let params = BTreeMap::from([("name".to_string(), "ÉTÉ".to_string())]);
        let found = catalog
            .search(&CatalogFilter::from_params(&params).unwrap())
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].latin_name, "Monarda fistulosa");
    }
}
