//! Row key validation
//!
//! Import rows are keyed by Latin name. Rows whose key is not in the catalog
//! are reported, not fatal: source sheets routinely carry draft species
//! that have not been added yet.

use std::collections::{BTreeMap, HashSet};

use crate::core::repository::{CatalogRepository, StoreResult};

/// Case-insensitive set of Latin names present in the catalog
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    keys: HashSet<String>,
}

impl KeyIndex {
    pub fn load<R: CatalogRepository>(repo: &R) -> StoreResult<Self> {
        Ok(Self { keys: repo.keys()? })
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys.into_iter().map(|k| k.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn contains(&self, latin_name: &str) -> bool {
        self.keys.contains(&latin_name.trim().to_lowercase())
    }
}

/// Rows split by whether their key exists
#[derive(Debug)]
pub struct Partition<T> {
    pub present: Vec<T>,
    pub missing: Vec<T>,
}

/// Split rows into those whose key is in the catalog and those whose key is not
pub fn partition<T, F>(rows: Vec<T>, index: &KeyIndex, key: F) -> Partition<T>
where
    F: Fn(&T) -> &str,
{
    let (present, missing) = rows.into_iter().partition(|row| index.contains(key(row)));
    Partition { present, missing }
}

/// A key that appears on more than one row of the same file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// Spelling from the first occurrence
    pub key: String,
    /// 1-based line numbers, header included
    pub lines: Vec<usize>,
}

/// Find keys occurring more than once, ignoring case
pub fn find_duplicates<'a, I>(keys: I) -> Vec<Duplicate>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut seen: BTreeMap<String, Duplicate> = BTreeMap::new();
    for (line, key) in keys {
        seen.entry(key.trim().to_lowercase())
            .or_insert_with(|| Duplicate {
                key: key.trim().to_string(),
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }
    seen.into_values().filter(|d| d.lines.len() > 1).collect()
}
