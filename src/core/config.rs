//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::Project;

/// Default number of problem keys printed per list in an import summary
pub const DEFAULT_DISPLAY_LIMIT: usize = 20;

/// Deployment mode. Destructive commands only run in development.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    fn parse(s: &str) -> Option<Mode> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Mode::Development),
            "production" | "prod" => Some(Mode::Production),
            _ => None,
        }
    }
}

/// Seedcat configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Development or production
    pub mode: Option<Mode>,

    /// Catalog database, relative to the project root
    pub database: Option<PathBuf>,

    /// How many problem keys an import summary prints per list
    pub display_limit: Option<usize>,
}

impl Config {
    /// Load configuration for a project, merging sources in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/seedcat/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.seedcat/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(mode) = std::env::var("SEEDCAT_MODE") {
            if let Some(mode) = Mode::parse(&mode) {
                config.mode = Some(mode);
            } else {
                tracing::warn!(value = %mode, "ignoring unknown SEEDCAT_MODE");
            }
        }
        if let Ok(database) = std::env::var("SEEDCAT_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "seedcat")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.mode.is_some() {
            self.mode = other.mode;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.display_limit.is_some() {
            self.display_limit = other.display_limit;
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit.unwrap_or(DEFAULT_DISPLAY_LIMIT)
    }

    /// Database path relative to the project root, unless absolute
    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(".seedcat/catalog.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mode(), Mode::Development);
        assert_eq!(config.display_limit(), DEFAULT_DISPLAY_LIMIT);
        assert_eq!(config.database(), PathBuf::from(".seedcat/catalog.db"));
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut config: Config =
            serde_yml::from_str("mode: development\ndisplay_limit: 5\n").unwrap();
        let project: Config = serde_yml::from_str("mode: production\n").unwrap();
        config.merge(project);
        assert_eq!(config.mode(), Mode::Production);
        assert_eq!(config.display_limit(), 5);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("PROD"), Some(Mode::Production));
        assert_eq!(Mode::parse("dev"), Some(Mode::Development));
        assert_eq!(Mode::parse("staging"), None);
    }
}
