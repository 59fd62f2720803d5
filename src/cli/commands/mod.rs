//! CLI command implementations

pub mod completions;
pub mod convert;
pub mod entry;
pub mod export;
pub mod fields;
pub mod import;
pub mod init;
pub mod reference;
pub mod search;
