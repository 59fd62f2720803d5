//! CSV export of a single catalog field
//!
//! Writes the same `latin_name,<field>` layout the property importer reads,
//! so an export can be edited and imported back.

use std::io::Write;

use thiserror::Error;

use crate::core::field::CatalogField;
use crate::core::repository::{CatalogRepository, StoreError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Write `latin_name,<field>` for every entry; returns the row count
pub fn export_field<R, W>(repo: &R, field: CatalogField, out: W) -> Result<usize, ExportError>
where
    R: CatalogRepository,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["latin_name", field.name()])?;

    let entries = repo.entries()?;
    for entry in &entries {
        writer.write_record([entry.latin_name.as_str(), &entry.get(field).to_cell()])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{CatalogEntry, FieldValue};
    use crate::core::memory::MemoryCatalog;

    #[test]
    fn test_export_writes_header_and_cells() {
        let mut repo = MemoryCatalog::new();
        let mut entry = CatalogEntry::new("Acer rubrum");
        entry.set(CatalogField::HeightMax, FieldValue::Decimal(25.0));
        repo.upsert(&entry).unwrap();
        repo.add_entry("Asarum canadense").unwrap();

        let mut out = Vec::new();
        let count = export_field(&repo, CatalogField::HeightMax, &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "latin_name,height_max\nAcer rubrum,25\nAsarum canadense,\n"
        );
    }
}
