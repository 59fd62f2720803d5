//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::Config;
use crate::core::repository::StoreError;
use crate::core::store::SqliteCatalog;

/// Directory marking a project root
const PROJECT_DIR: &str = ".seedcat";

/// Represents a seedcat project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .seedcat/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path, with config and empty catalog
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .seedcat/ exists; existing config and catalog are kept
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        let project = Self { root };

        std::fs::create_dir_all(project.seedcat_dir())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::create_dir_all(project.root.join("imports"))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        if !project.config_path().exists() {
            std::fs::write(project.config_path(), Self::default_config())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        project.open_catalog(&Config::load_for(Some(&project)))?;

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# Seedcat Project Configuration

# development or production. 'seedcat import populate' refuses to run
# in production because it empties the catalog first.
mode: development

# Catalog database, relative to the project root
# database: .seedcat/catalog.db

# Problem keys listed per category in import summaries
# display_limit: 20
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .seedcat configuration directory
    pub fn seedcat_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.seedcat_dir().join("config.yaml")
    }

    /// Resolve the configured database path against the project root
    pub fn database_path(&self, config: &Config) -> PathBuf {
        let database = config.database();
        if database.is_absolute() {
            database
        } else {
            self.root.join(database)
        }
    }

    /// Open (creating if needed) the project's catalog
    pub fn open_catalog(&self, config: &Config) -> Result<SqliteCatalog, ProjectError> {
        let path = self.database_path(config);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError(e.to_string()))?;
        }
        Ok(SqliteCatalog::open(&path)?)
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a seedcat project (searched from {searched_from:?}). Run 'seedcat init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("seedcat project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("cannot open catalog: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::CatalogRepository;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.seedcat_dir().is_dir());
        assert!(project.config_path().exists());
        assert!(project.root().join("imports").is_dir());
        assert!(project.seedcat_dir().join("catalog.db").exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_init_force_keeps_catalog() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = Config::default();
        {
            let mut catalog = project.open_catalog(&config).unwrap();
            catalog
                .upsert(&crate::core::CatalogEntry::new("Acer rubrum"))
                .unwrap();
        }
        let project = Project::init_force(tmp.path()).unwrap();
        let catalog = project.open_catalog(&config).unwrap();
        assert_eq!(catalog.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_project_discover_finds_seedcat_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_seedcat_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
