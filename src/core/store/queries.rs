//! SQL generation and row decoding for catalog entries

use rusqlite::types::Value;
use rusqlite::Row;

use crate::core::entry::{CatalogEntry, FieldValue, ReferenceValue};
use crate::core::field::{CatalogField, FieldKind};

/// `SELECT` over `catalog_entries e` with one `LEFT JOIN` per reference field.
///
/// Reference fields select both the id and the joined label, so each one
/// takes two columns in [`decode_row`].
pub(super) fn select_sql() -> String {
    let mut columns = vec![
        "e.id".to_string(),
        "e.latin_name".to_string(),
        "e.updated_at".to_string(),
    ];
    let mut joins = Vec::new();

    for field in CatalogField::ALL {
        let name = field.name();
        columns.push(format!("e.{}", name));
        if let FieldKind::Reference(table) = field.kind() {
            columns.push(format!("r_{}.label", name));
            joins.push(format!(
                "LEFT JOIN {table} r_{name} ON r_{name}.id = e.{name}",
                table = table.sql_table(),
                name = name
            ));
        }
    }

    format!(
        "SELECT {} FROM catalog_entries e {}",
        columns.join(", "),
        joins.join(" ")
    )
}

pub(super) fn insert_sql() -> String {
    let mut columns = vec!["latin_name"];
    columns.extend(CatalogField::ALL.iter().map(|f| f.name()));
    columns.push("updated_at");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO catalog_entries ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
}

/// Parameters: latin name, every field in order, timestamp, id
pub(super) fn update_sql() -> String {
    let mut assignments = vec!["latin_name = ?".to_string()];
    assignments.extend(CatalogField::ALL.iter().map(|f| format!("{} = ?", f.name())));
    assignments.push("updated_at = ?".to_string());
    format!(
        "UPDATE catalog_entries SET {} WHERE id = ?",
        assignments.join(", ")
    )
}

pub(super) fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Integer(v) => Value::Integer(*v),
        FieldValue::Decimal(v) => Value::Real(*v),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Reference(r) => Value::Integer(r.id),
    }
}

pub(super) fn decode_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let mut entry = CatalogEntry::new(row.get::<_, String>(1)?);
    entry.id = row.get(0)?;
    entry.updated_at = row.get(2)?;

    let mut idx = 3;
    for field in CatalogField::ALL {
        let value = match field.kind() {
            FieldKind::Boolean => FieldValue::Bool(row.get::<_, i64>(idx)? != 0),
            FieldKind::Integer { .. } => row
                .get::<_, Option<i64>>(idx)?
                .map(FieldValue::Integer)
                .unwrap_or(FieldValue::Null),
            FieldKind::Decimal => row
                .get::<_, Option<f64>>(idx)?
                .map(FieldValue::Decimal)
                .unwrap_or(FieldValue::Null),
            FieldKind::Text => row
                .get::<_, Option<String>>(idx)?
                .map(FieldValue::Text)
                .unwrap_or(FieldValue::Null),
            FieldKind::Reference(table) => {
                let id: Option<i64> = row.get(idx)?;
                idx += 1;
                let label: Option<String> = row.get(idx)?;
                match (id, label) {
                    (Some(id), Some(label)) => {
                        FieldValue::Reference(ReferenceValue { table, id, label })
                    }
                    _ => FieldValue::Null,
                }
            }
        };
        idx += 1;
        entry.set(*field, value);
    }

    Ok(entry)
}
