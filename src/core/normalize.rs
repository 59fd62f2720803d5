//! Field normalization for raw CSV/spreadsheet cells
//!
//! Cells are normalized into [`CellValue`]s before any reference lookup.
//! Input that cannot be interpreted is returned as
//! [`Normalized::Unrecognized`] so the importer decides whether to warn,
//! coerce or skip, instead of silently guessing here.

use thiserror::Error;

use crate::core::entry::AssociationKind;
use crate::core::field::{CatalogField, FieldKind};

/// Outcome of normalizing one cell
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Value(T),
    /// The original text, which matched no accepted spelling
    Unrecognized(String),
}

/// A normalized cell, not yet resolved against reference tables
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    /// Label to resolve in a reference table
    Label(String),
    /// Empty reference cell: leave the stored reference untouched
    Keep,
}

/// Parse a yes/no cell. Empty means no.
pub fn parse_bool(raw: &str) -> Normalized<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" => Normalized::Value(true),
        "no" | "n" | "false" | "" => Normalized::Value(false),
        _ => Normalized::Unrecognized(raw.to_string()),
    }
}

/// Parse a whole number, accepting integral decimals such as `4.0`
pub fn parse_integer(raw: &str) -> Normalized<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Normalized::Value(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Normalized::Value(v as i64)
        }
        _ => Normalized::Unrecognized(raw.to_string()),
    }
}

/// Parse a decimal, accepting a comma as decimal separator
pub fn parse_decimal(raw: &str) -> Normalized<f64> {
    let trimmed = raw.trim().replace(',', ".");
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Normalized::Value(v),
        _ => Normalized::Unrecognized(raw.to_string()),
    }
}

/// Normalize a cell for the given target field
pub fn normalize_cell(field: CatalogField, raw: &str) -> Normalized<CellValue> {
    let trimmed = raw.trim();
    match field.kind() {
        FieldKind::Boolean => match parse_bool(trimmed) {
            Normalized::Value(b) => Normalized::Value(CellValue::Bool(b)),
            Normalized::Unrecognized(_) => Normalized::Unrecognized(raw.to_string()),
        },
        FieldKind::Integer { default_zero } => {
            if trimmed.is_empty() {
                return Normalized::Value(if default_zero {
                    CellValue::Integer(0)
                } else {
                    CellValue::Null
                });
            }
            match parse_integer(trimmed) {
                Normalized::Value(v) => Normalized::Value(CellValue::Integer(v)),
                Normalized::Unrecognized(_) => Normalized::Unrecognized(raw.to_string()),
            }
        }
        FieldKind::Decimal => {
            if trimmed.is_empty() {
                return Normalized::Value(CellValue::Null);
            }
            match parse_decimal(trimmed) {
                Normalized::Value(v) => Normalized::Value(CellValue::Decimal(v)),
                Normalized::Unrecognized(_) => Normalized::Unrecognized(raw.to_string()),
            }
        }
        FieldKind::Text => {
            if trimmed.is_empty() {
                Normalized::Value(CellValue::Null)
            } else {
                Normalized::Value(CellValue::Text(trimmed.to_string()))
            }
        }
        FieldKind::Reference(_) => {
            if trimmed.is_empty() {
                Normalized::Value(CellValue::Keep)
            } else {
                Normalized::Value(CellValue::Label(trimmed.to_string()))
            }
        }
    }
}

/// Normalize a Latin name into the catalog join key.
///
/// Trims surrounding whitespace and uppercases the first character, leaving
/// the rest as written. Returns `None` for an empty cell.
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Column header naming the target of a relation, e.g. `bee-Bombus impatiens`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundHeader {
    pub kind: AssociationKind,
    pub english_name: Option<String>,
    pub latin_name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("column '{header}': expected '<kind>-<latin name>' or '<kind>-<english name>-<latin name>'")]
    Malformed { header: String },

    #[error("column '{header}': kind '{found}' does not match the '{expected}' import")]
    WrongKind {
        header: String,
        found: String,
        expected: AssociationKind,
    },

    #[error("column '{header}': latin name is empty")]
    EmptyLatinName { header: String },
}

/// Split a compound relation header on `-`.
///
/// Accepted forms are `<kind>-<latin>` and `<kind>-<english>-<latin>`. An
/// empty kind segment (`-<english>-<latin>`) stands for the kind being
/// imported.
///
/// Latin names may carry hyphenated epithets (`Symphyotrichum
/// novae-angliae`), so the English/Latin boundary is the last `-` followed
/// by a capital letter. A hyphen followed by lowercase text belongs to the
/// name it sits in. Without such a boundary the whole remainder must read
/// as a Latin name, genus capitalized.
pub fn parse_compound_header(
    header: &str,
    expected: AssociationKind,
) -> Result<CompoundHeader, HeaderError> {
    let malformed = || HeaderError::Malformed {
        header: header.to_string(),
    };
    let (kind_part, rest) = header.trim().split_once('-').ok_or_else(malformed)?;
    let kind_part = kind_part.trim();

    let boundary = rest
        .char_indices()
        .filter(|(_, c)| *c == '-')
        .filter(|(i, _)| {
            rest[i + 1..]
                .trim_start()
                .chars()
                .next()
                .is_some_and(char::is_uppercase)
        })
        .map(|(i, _)| i)
        .last();

    let (english, latin) = match boundary {
        Some(i) => (Some(rest[..i].trim()), rest[i + 1..].trim()),
        None => {
            let latin = rest.trim();
            if latin.contains('-') && !latin.chars().next().is_some_and(char::is_uppercase) {
                return Err(malformed());
            }
            (None, latin)
        }
    };

    if !kind_part.is_empty() {
        let kind: AssociationKind = kind_part.parse().map_err(|_| malformed())?;
        if kind != expected {
            return Err(HeaderError::WrongKind {
                header: header.to_string(),
                found: kind_part.to_string(),
                expected,
            });
        }
    }

    let latin_name = normalize_key(latin).ok_or_else(|| HeaderError::EmptyLatinName {
        header: header.to_string(),
    })?;

    Ok(CompoundHeader {
        kind: expected,
        english_name: english.filter(|e| !e.is_empty()).map(String::from),
        latin_name,
    })
}
