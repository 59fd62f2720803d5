//! Catalog entries, reference values and species associations

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::core::field::{CatalogField, FieldKind, ReferenceTable};

/// A row of a reference table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceValue {
    pub table: ReferenceTable,
    pub id: i64,
    pub label: String,
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Reference(ReferenceValue),
}

impl FieldValue {
    /// Value an entry holds for a field it never set
    pub fn default_for(field: CatalogField) -> FieldValue {
        match field.kind() {
            FieldKind::Boolean => FieldValue::Bool(false),
            FieldKind::Integer { default_zero: true } => FieldValue::Integer(0),
            _ => FieldValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }

    /// Numeric view used by range filters
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Reference(r) => Some(&r.label),
            _ => None,
        }
    }

    /// Render the value the way it is written to CSV (`yes`/`no` for flags)
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(true) => "yes".to_string(),
            FieldValue::Bool(false) => "no".to_string(),
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Decimal(v) => v.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Reference(r) => r.label.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cell())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Integer(v) => serializer.serialize_i64(*v),
            FieldValue::Decimal(v) => serializer.serialize_f64(*v),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Reference(r) => serializer.serialize_str(&r.label),
        }
    }
}

/// One plant species in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Storage identifier, 0 until the entry is persisted
    pub id: i64,
    pub latin_name: String,
    values: BTreeMap<CatalogField, FieldValue>,
    /// RFC 3339 timestamp of the last write
    pub updated_at: Option<String>,
}

impl CatalogEntry {
    pub fn new(latin_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            latin_name: latin_name.into(),
            values: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// Current value of a field, falling back to the field default
    pub fn get(&self, field: CatalogField) -> FieldValue {
        self.values
            .get(&field)
            .cloned()
            .unwrap_or_else(|| FieldValue::default_for(field))
    }

    /// Set a field, returning true if the stored value changed
    pub fn set(&mut self, field: CatalogField, value: FieldValue) -> bool {
        if self.get(field) == value {
            return false;
        }
        self.values.insert(field, value);
        true
    }

    pub fn english_name(&self) -> Option<String> {
        self.get(CatalogField::EnglishName).as_text().map(String::from)
    }

    pub fn french_name(&self) -> Option<String> {
        self.get(CatalogField::FrenchName).as_text().map(String::from)
    }

    /// Check cross-field invariants before a write
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.latin_name.trim().is_empty() {
            return Err("latin name is required".to_string());
        }
        if let (Some(min), Some(max)) = (
            self.get(CatalogField::HeightMin).as_f64(),
            self.get(CatalogField::HeightMax).as_f64(),
        ) {
            if min > max {
                return Err(format!(
                    "height_min ({}) is greater than height_max ({})",
                    min, max
                ));
            }
        }
        Ok(())
    }

    /// All fields with their current values, in schema order
    pub fn fields(&self) -> impl Iterator<Item = (CatalogField, FieldValue)> + '_ {
        CatalogField::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// JSON object of the entry (used by `--format json`)
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "latin_name".to_string(),
            serde_json::Value::String(self.latin_name.clone()),
        );
        for (field, value) in self.fields() {
            map.insert(
                field.name().to_string(),
                serde_json::to_value(&value).unwrap_or(serde_json::Value::Null),
            );
        }
        serde_json::Value::Object(map)
    }
}

/// Kind of species association toggled by relation imports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssociationKind {
    /// Bee species supported by the plant
    Bee,
    /// Butterfly species hosted by the plant
    Butterfly,
    /// Non-native species the plant can replace
    NonNative,
    /// Plant that grows well next to the entry
    Companion,
    /// Plant that complements the entry in a garden design
    Complementary,
}

impl AssociationKind {
    pub const ALL: &'static [AssociationKind] = &[
        AssociationKind::Bee,
        AssociationKind::Butterfly,
        AssociationKind::NonNative,
        AssociationKind::Companion,
        AssociationKind::Complementary,
    ];

    /// Token used in compound CSV headers and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationKind::Bee => "bee",
            AssociationKind::Butterfly => "butterfly",
            AssociationKind::NonNative => "nonnative",
            AssociationKind::Companion => "companion",
            AssociationKind::Complementary => "complementary",
        }
    }

    /// Companion and complementary relations point at other catalog entries
    pub fn targets_catalog(&self) -> bool {
        matches!(
            self,
            AssociationKind::Companion | AssociationKind::Complementary
        )
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssociationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bee" | "bees" => Ok(AssociationKind::Bee),
            "butterfly" | "butterflies" => Ok(AssociationKind::Butterfly),
            "nonnative" | "non-native" | "non_native" => Ok(AssociationKind::NonNative),
            "companion" => Ok(AssociationKind::Companion),
            "complementary" | "complement" => Ok(AssociationKind::Complementary),
            _ => Err(format!(
                "Unknown association kind: '{}'. Supported: bee, butterfly, nonnative, companion, complementary",
                s
            )),
        }
    }
}

/// A pollinator or non-native species record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    pub id: i64,
    pub kind: AssociationKind,
    pub latin_name: String,
    pub english_name: Option<String>,
}
