//! Core module - catalog model, normalization and storage

pub mod config;
pub mod entry;
pub mod export;
pub mod field;
pub mod memory;
pub mod normalize;
pub mod project;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod validator;

pub use config::{Config, Mode};
pub use entry::{AssociationKind, CatalogEntry, FieldValue, ReferenceValue, Species};
pub use field::{CatalogField, FieldKind, ReferenceTable};
pub use memory::MemoryCatalog;
pub use project::{Project, ProjectError};
pub use query::{CatalogFilter, Predicate, QueryError};
pub use repository::{CatalogRepository, StoreError, StoreResult};
pub use resolver::ReferenceResolver;
pub use store::SqliteCatalog;
