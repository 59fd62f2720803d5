//! Catalog query and filter engine
//!
//! Translates a flat map of query parameters into a conjunction of
//! [`Predicate`]s. A filter can be evaluated against entries in memory or
//! compiled into a SQL `WHERE` clause for the SQLite store.

use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use thiserror::Error;

use crate::core::entry::{CatalogEntry, FieldValue};
use crate::core::field::{CatalogField, FieldKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown query parameter '{0}'")]
    UnknownParameter(String),

    #[error("query parameter '{name}' expects a number, got '{value}'")]
    InvalidNumber { name: String, value: String },
}

/// The three name columns searched by text filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    Latin,
    English,
    French,
}

impl NameField {
    pub const ALL: [NameField; 3] = [NameField::Latin, NameField::English, NameField::French];

    fn column(&self) -> &'static str {
        match self {
            NameField::Latin => "e.latin_name",
            NameField::English => "e.english_name",
            NameField::French => "e.french_name",
        }
    }

    fn value(&self, entry: &CatalogEntry) -> Option<String> {
        match self {
            NameField::Latin => Some(entry.latin_name.clone()),
            NameField::English => entry.english_name(),
            NameField::French => entry.french_name(),
        }
    }
}

/// A single constraint on catalog entries
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsTrue(CatalogField),
    NotTrue(CatalogField),
    Contains(NameField, String),
    AnyNameContains(String),
    AtLeast(CatalogField, f64),
    AtMost(CatalogField, f64),
    LabelEquals(CatalogField, String),
    /// Matches nothing
    Never,
}

impl Predicate {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Predicate::IsTrue(field) => entry.get(*field).as_bool(),
            Predicate::NotTrue(field) => !entry.get(*field).as_bool(),
            Predicate::Contains(name, needle) => name
                .value(entry)
                .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::AnyNameContains(needle) => NameField::ALL
                .iter()
                .any(|n| Predicate::Contains(*n, needle.clone()).matches(entry)),
            Predicate::AtLeast(field, bound) => {
                entry.get(*field).as_f64().is_some_and(|v| v >= *bound)
            }
            Predicate::AtMost(field, bound) => {
                entry.get(*field).as_f64().is_some_and(|v| v <= *bound)
            }
            Predicate::LabelEquals(field, label) => {
                matches!(entry.get(*field), FieldValue::Reference(ref r) if r.label == *label)
            }
            Predicate::Never => false,
        }
    }

    /// Whether the SQL rendering selects exactly the entries `matches` accepts
    fn exact_in_sql(&self) -> bool {
        match self {
            Predicate::Contains(_, needle) | Predicate::AnyNameContains(needle) => {
                needle.is_ascii()
            }
            _ => true,
        }
    }

    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            Predicate::IsTrue(field) => format!("e.{} = 1", field.name()),
            Predicate::NotTrue(field) => format!("e.{} != 1", field.name()),
            // SQLite lower() only folds ASCII; other needles are left to matches()
            Predicate::Contains(_, needle) if !needle.is_ascii() => "1".to_string(),
            Predicate::Contains(name, needle) => {
                params.push(SqlValue::Text(needle.to_lowercase()));
                format!("instr(lower({}), ?) > 0", name.column())
            }
            Predicate::AnyNameContains(needle) => {
                let clauses: Vec<String> = NameField::ALL
                    .iter()
                    .map(|n| Predicate::Contains(*n, needle.clone()).to_sql(params))
                    .collect();
                format!("({})", clauses.join(" OR "))
            }
            Predicate::AtLeast(field, bound) => {
                params.push(SqlValue::Real(*bound));
                format!("e.{} >= ?", field.name())
            }
            Predicate::AtMost(field, bound) => {
                params.push(SqlValue::Real(*bound));
                format!("e.{} <= ?", field.name())
            }
            Predicate::LabelEquals(field, label) => {
                params.push(SqlValue::Text(label.clone()));
                format!("r_{}.label = ?", field.name())
            }
            Predicate::Never => "0".to_string(),
        }
    }
}

/// How a single-valued range parameter constrains its field
#[derive(Debug, Clone, Copy)]
enum Bound {
    AtLeast,
    AtMost,
}

/// Range parameters and the side they bound
const RANGE_PARAMS: &[(CatalogField, Bound)] = &[
    (CatalogField::BloomStart, Bound::AtLeast),
    (CatalogField::HarvestingStart, Bound::AtLeast),
    (CatalogField::BloomEnd, Bound::AtMost),
    (CatalogField::HeightMax, Bound::AtMost),
    (CatalogField::StratificationDuration, Bound::AtMost),
];

/// Reference fields filtered by exact label
const CATEGORY_PARAMS: &[CatalogField] = &[
    CatalogField::Color,
    CatalogField::Lifespan,
    CatalogField::GrowthHabit,
];

/// Values that turn a boolean filter into an inclusion
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Conjunction of predicates over the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    predicates: Vec<Predicate>,
}

impl CatalogFilter {
    /// Build a filter from query parameters.
    ///
    /// A parameter that is absent imposes nothing. A boolean parameter that
    /// is present always constrains: truthy includes, anything else
    /// (including empty) excludes. An empty category selects nothing.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, QueryError> {
        let mut predicates = Vec::new();

        for (name, value) in params {
            let key = name.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "name" => {
                    if !value.is_empty() {
                        predicates.push(Predicate::AnyNameContains(value.to_string()));
                    }
                    continue;
                }
                "latin_name" | "english_name" | "french_name" => {
                    let field = match key.as_str() {
                        "latin_name" => NameField::Latin,
                        "english_name" => NameField::English,
                        _ => NameField::French,
                    };
                    if !value.is_empty() {
                        predicates.push(Predicate::Contains(field, value.to_string()));
                    }
                    continue;
                }
                _ => {}
            }

            let field = CatalogField::from_name(&key)
                .ok_or_else(|| QueryError::UnknownParameter(name.clone()))?;

            if field.kind() == FieldKind::Boolean {
                predicates.push(if is_truthy(value) {
                    Predicate::IsTrue(field)
                } else {
                    Predicate::NotTrue(field)
                });
            } else if let Some((_, bound)) = RANGE_PARAMS.iter().find(|(f, _)| *f == field) {
                if value.is_empty() {
                    continue;
                }
                let number: f64 = value.replace(',', ".").parse().map_err(|_| {
                    QueryError::InvalidNumber {
                        name: name.clone(),
                        value: value.to_string(),
                    }
                })?;
                predicates.push(match bound {
                    Bound::AtLeast => Predicate::AtLeast(field, number),
                    Bound::AtMost => Predicate::AtMost(field, number),
                });
            } else if CATEGORY_PARAMS.contains(&field) {
                predicates.push(if value.is_empty() {
                    Predicate::Never
                } else {
                    Predicate::LabelEquals(field, value.to_string())
                });
            } else {
                return Err(QueryError::UnknownParameter(name.clone()));
            }
        }

        Ok(Self { predicates })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.predicates.iter().all(|p| p.matches(entry))
    }

    /// False when rows selected by [`CatalogFilter::to_sql`] still need
    /// [`CatalogFilter::matches`] applied
    pub fn exact_in_sql(&self) -> bool {
        self.predicates.iter().all(Predicate::exact_in_sql)
    }

    /// SQL condition over `catalog_entries e` joined with `r_<field>` label tables
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut params = Vec::new();
        if self.predicates.is_empty() {
            return ("1=1".to_string(), params);
        }
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.to_sql(&mut params))
            .collect();
        (clauses.join(" AND "), params)
    }
}

/// Every parameter name the filter understands
pub fn parameter_names() -> Vec<&'static str> {
    let mut names = vec!["name", "latin_name", "english_name", "french_name"];
    names.extend(
        CatalogField::ALL
            .iter()
            .filter(|f| f.is_boolean())
            .map(|f| f.name()),
    );
    names.extend(RANGE_PARAMS.iter().map(|(f, _)| f.name()));
    names.extend(CATEGORY_PARAMS.iter().map(|f| f.name()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::ReferenceValue;
    use crate::core::field::ReferenceTable;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entry(name: &str, full_sun: bool) -> CatalogEntry {
        let mut e = CatalogEntry::new(name);
        e.set(CatalogField::FullSun, FieldValue::Bool(full_sun));
        e
    }

    #[test]
    fn test_boolean_truthy_includes() {
        let filter = CatalogFilter::from_params(&params(&[("full_sun", "1")])).unwrap();
        assert!(filter.matches(&entry("Acer rubrum", true)));
        assert!(!filter.matches(&entry("Asarum canadense", false)));
    }

    #[test]
    fn test_boolean_empty_excludes() {
        let filter = CatalogFilter::from_params(&params(&[("full_sun", "")])).unwrap();
        assert!(!filter.matches(&entry("Acer rubrum", true)));
        assert!(filter.matches(&entry("Asarum canadense", false)));
    }

    #[test]
    fn test_absent_parameter_imposes_nothing() {
        let filter = CatalogFilter::from_params(&BTreeMap::new()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&entry("Acer rubrum", true)));
        assert!(filter.matches(&entry("Asarum canadense", false)));
    }

    #[test]
    fn test_any_name_search() {
        let mut e = entry("Asclepias syriaca", true);
        e.set(
            CatalogField::FrenchName,
            FieldValue::Text("Asclépiade commune".to_string()),
        );
        e.set(
            CatalogField::EnglishName,
            FieldValue::Text("Common milkweed".to_string()),
        );
        for needle in ["SYRIACA", "milkweed", "commune"] {
            let filter = CatalogFilter::from_params(&params(&[("name", needle)])).unwrap();
            assert!(filter.matches(&e), "{needle}");
        }
        let filter = CatalogFilter::from_params(&params(&[("name", "oak")])).unwrap();
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_range_bounds() {
        let mut e = entry("Monarda fistulosa", true);
        e.set(CatalogField::BloomStart, FieldValue::Integer(6));
        e.set(CatalogField::BloomEnd, FieldValue::Integer(8));

        let f = CatalogFilter::from_params(&params(&[("bloom_start", "6"), ("bloom_end", "9")]))
            .unwrap();
        assert!(f.matches(&e));
        let f = CatalogFilter::from_params(&params(&[("bloom_start", "7")])).unwrap();
        assert!(!f.matches(&e));
        let f = CatalogFilter::from_params(&params(&[("bloom_end", "7")])).unwrap();
        assert!(!f.matches(&e));
        let f = CatalogFilter::from_params(&params(&[("height_max", "")])).unwrap();
        assert!(f.is_empty());
    }

    #[test]
    fn test_category_exact_and_empty() {
        let mut e = entry("Monarda fistulosa", true);
        e.set(
            CatalogField::Color,
            FieldValue::Reference(ReferenceValue {
                table: ReferenceTable::Color,
                id: 1,
                label: "Purple".to_string(),
            }),
        );
        let f = CatalogFilter::from_params(&params(&[("color", "Purple")])).unwrap();
        assert!(f.matches(&e));
        let f = CatalogFilter::from_params(&params(&[("color", "Purp")])).unwrap();
        assert!(!f.matches(&e));
        let f = CatalogFilter::from_params(&params(&[("color", "")])).unwrap();
        assert_eq!(f.predicates(), &[Predicate::Never]);
        assert!(!f.matches(&e));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            CatalogFilter::from_params(&params(&[("wingspan", "3")])),
            Err(QueryError::UnknownParameter("wingspan".to_string()))
        );
        assert!(matches!(
            CatalogFilter::from_params(&params(&[("bloom_start", "June")])),
            Err(QueryError::InvalidNumber { .. })
        ));
        // Non-filterable field
        assert!(CatalogFilter::from_params(&params(&[("notes", "x")])).is_err());
    }

    #[test]
    fn test_to_sql_binds_parameters() {
        let f = CatalogFilter::from_params(&params(&[("full_sun", "yes"), ("name", "acer")]))
            .unwrap();
        let (sql, values) = f.to_sql();
        assert!(sql.contains("e.full_sun = 1"));
        assert!(sql.contains(" AND "));
        assert_eq!(values.len(), 3);
        assert_eq!(CatalogFilter::default().to_sql().0, "1=1");
    }
}
