//! Database schema initialization

use rusqlite::params;

use super::{SqliteCatalog, SCHEMA_VERSION};
use crate::core::field::{CatalogField, FieldKind, ReferenceTable};
use crate::core::repository::StoreResult;

/// Column definition for a catalog field
fn column_definition(field: CatalogField) -> String {
    let ty = match field.kind() {
        FieldKind::Boolean => "INTEGER NOT NULL DEFAULT 0".to_string(),
        FieldKind::Integer { default_zero: true } => "INTEGER NOT NULL DEFAULT 0".to_string(),
        FieldKind::Integer { default_zero: false } => "INTEGER".to_string(),
        FieldKind::Decimal => "REAL".to_string(),
        FieldKind::Text => "TEXT".to_string(),
        FieldKind::Reference(table) => format!(
            "INTEGER REFERENCES {}(id) ON DELETE RESTRICT",
            table.sql_table()
        ),
    };
    format!("{} {}", field.name(), ty)
}

/// Full schema script, generated from the field table
pub(super) fn schema_sql() -> String {
    let mut sql = String::from(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        "#,
    );

    // Reference label tables
    for table in ReferenceTable::ALL {
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY,\n    label TEXT NOT NULL UNIQUE\n);\n",
            table.sql_table()
        ));
    }

    // Catalog entries, one column per field
    let mut columns = vec![
        "id INTEGER PRIMARY KEY".to_string(),
        "latin_name TEXT NOT NULL UNIQUE COLLATE NOCASE".to_string(),
    ];
    columns.extend(CatalogField::ALL.iter().map(|f| column_definition(*f)));
    columns.push("updated_at TEXT".to_string());
    columns.push(format!(
        "CHECK ({min} IS NULL OR {max} IS NULL OR {min} <= {max})",
        min = CatalogField::HeightMin.name(),
        max = CatalogField::HeightMax.name()
    ));
    sql.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS catalog_entries (\n    {}\n);\n",
        columns.join(",\n    ")
    ));

    sql.push_str(
        r#"
        -- Pollinator and non-native species records
        CREATE TABLE IF NOT EXISTS species (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            latin_name TEXT NOT NULL COLLATE NOCASE,
            english_name TEXT,
            UNIQUE (kind, latin_name)
        );

        -- Entry -> species (bee, butterfly, nonnative) or entry -> entry
        -- (companion, complementary) relations
        CREATE TABLE IF NOT EXISTS associations (
            kind TEXT NOT NULL,
            entry_id INTEGER NOT NULL REFERENCES catalog_entries(id) ON DELETE CASCADE,
            target_id INTEGER NOT NULL,
            PRIMARY KEY (kind, entry_id, target_id)
        );
        CREATE INDEX IF NOT EXISTS idx_associations_target ON associations(kind, target_id);
        "#,
    );

    sql
}

impl SqliteCatalog {
    /// Initialize database schema
    pub(super) fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(&schema_sql())?;
        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_a_column_per_field() {
        let sql = schema_sql();
        for field in CatalogField::ALL {
            assert!(sql.contains(&column_definition(*field)), "{}", field);
        }
        for table in ReferenceTable::ALL {
            assert!(sql.contains(&table.sql_table()));
        }
    }
}
