//! Configuration for a watched tree.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Configuration for a watched root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the root directory.
    pub root: PathBuf,

    /// Whether subdirectories are watched, including ones created later.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl WatchConfig {
    /// Create a new recursive config for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
        }
    }

    /// Watch only the root directory itself.
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Set recursive mode.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the root exists and is a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(
                self.root.display().to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and return the canonical root path.
    ///
    /// Child paths are resolved against this path, so it has to match the
    /// form the OS reports back in notifications.
    pub fn resolved_root(&self) -> Result<PathBuf> {
        self.validate()?;
        Ok(dunce::canonicalize(&self.root)?)
    }

    /// The configured root, as given.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_creation() {
        let config = WatchConfig::new("/notes").non_recursive();

        assert_eq!(config.root(), Path::new("/notes"));
        assert!(!config.recursive);
        assert!(config.with_recursive(true).recursive);
    }

    #[test]
    fn test_config_from_json_defaults_to_recursive() {
        let config = WatchConfig::from_json(r#"{ "root": "/notes" }"#).unwrap();
        assert_eq!(config, WatchConfig::new("/notes"));

        let config =
            WatchConfig::from_json(r#"{ "root": "/notes", "recursive": false }"#).unwrap();
        assert!(!config.recursive);
    }

    #[test]
    fn test_config_from_bad_json() {
        let err = WatchConfig::from_json("{ \"recursive\": true }").unwrap_err();
        assert!(matches!(err, WatcherError::Serialization(_)));
    }

    #[test]
    fn test_validate_missing_root() {
        let err = WatchConfig::new("/nonexistent/path/12345")
            .validate()
            .unwrap_err();
        assert!(matches!(err, WatcherError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_resolved_root_is_absolute() {
        let temp_dir = TempDir::new().unwrap();
        let root = WatchConfig::new(temp_dir.path()).resolved_root().unwrap();

        assert!(root.is_absolute());
        assert!(root.is_dir());
    }
}
