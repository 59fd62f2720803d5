//! Import error types

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::normalize::HeaderError;
use crate::core::repository::StoreError;

/// Errors that stop an import before or while it writes.
///
/// Row-level problems (unknown Latin names, bad cells, constraint failures)
/// are not errors: they are collected in the
/// [`ImportSummary`](super::ImportSummary).
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("cannot read {}: {source}", .path.display())]
    #[diagnostic(code(seedcat::import::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {}: {source}", .path.display())]
    #[diagnostic(code(seedcat::import::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read spreadsheet {}: {message}", .path.display())]
    #[diagnostic(code(seedcat::import::spreadsheet))]
    Spreadsheet { path: PathBuf, message: String },

    #[error("unsupported file type: {}", .path.display())]
    #[diagnostic(
        code(seedcat::import::format),
        help("Use a .csv file or a spreadsheet (.xlsx, .xlsm, .xls, .xlsb, .ods)")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("{} has no header row", .path.display())]
    #[diagnostic(code(seedcat::import::empty))]
    EmptyFile { path: PathBuf },

    #[error("header mismatch: expected '{expected}', found '{found}'")]
    #[diagnostic(
        code(seedcat::import::header),
        help("Print the expected header with 'seedcat import --template <pipeline>'")
    )]
    HeaderMismatch { expected: String, found: String },

    #[error("malformed relation header: {0}")]
    #[diagnostic(code(seedcat::import::relation_header))]
    Header(#[from] HeaderError),

    #[error("unknown column '{column}'")]
    #[diagnostic(
        code(seedcat::import::unknown_column),
        help("Run 'seedcat fields' to list the importable columns")
    )]
    UnknownColumn { column: String },

    #[error("{count} Latin name(s) appear more than once: {keys}")]
    #[diagnostic(
        code(seedcat::import::duplicates),
        help("Latin names are compared without case; keep one row per species")
    )]
    DuplicateKeys { count: usize, keys: String },

    #[error("refusing to repopulate the catalog in production mode")]
    #[diagnostic(
        code(seedcat::import::production),
        help("Set 'mode: development' in .seedcat/config.yaml or SEEDCAT_MODE=development")
    )]
    ProductionMode,

    #[error("{} is not a directory", .path.display())]
    #[diagnostic(code(seedcat::import::directory))]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(code(seedcat::store))]
    Store(#[from] StoreError),
}
