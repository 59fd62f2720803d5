//! seedcat: seed library catalog toolkit
//!
//! Keeps a native-plant catalog in SQLite and maintains it from the CSV
//! and spreadsheet files volunteers edit.

pub mod cli;
pub mod core;
pub mod import;
