//! Configuration files for feedsync
//!
//! Files live in one directory, `~/.config/feedsync/` by default. Setting
//! `FEEDSYNC_CONFIG_DIR` points every lookup somewhere else, which is how
//! tests and portable installs keep their settings apart.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the config directory under the platform config root
pub const APP_DIR: &str = "feedsync";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "FEEDSYNC_CONFIG_DIR";

/// A directory holding JSON config files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Use an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the config directory for this process
    ///
    /// `FEEDSYNC_CONFIG_DIR` wins over the platform default. Returns `None`
    /// only when neither is available.
    pub fn locate() -> Option<Self> {
        resolve(std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from), dirs::config_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `filename` inside this directory
    pub fn path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path(filename).exists()
    }

    /// Create the directory if it doesn't exist yet
    pub fn ensure(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create config directory: {}", self.root.display())
        })?;
        Ok(&self.root)
    }

    pub fn load_json<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        load_json_file(&self.path(filename))
    }

    /// Write `value` as pretty JSON, creating the directory first
    pub fn save_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        self.ensure()?;
        save_json_file(&self.path(filename), value)
    }
}

fn resolve(overridden: Option<PathBuf>, platform: Option<PathBuf>) -> Option<ConfigDir> {
    match overridden {
        Some(dir) if !dir.as_os_str().is_empty() => Some(ConfigDir::at(dir)),
        _ => platform.map(|root| ConfigDir::at(root.join(APP_DIR))),
    }
}

/// Get the feedsync config directory
pub fn config_dir() -> Option<PathBuf> {
    ConfigDir::locate().map(|dir| dir.root)
}

/// Get the path to a file in the feedsync config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    ConfigDir::locate().map(|dir| dir.path(filename))
}

/// Check if a file exists in the feedsync config directory
pub fn config_exists(filename: &str) -> bool {
    ConfigDir::locate().is_some_and(|dir| dir.exists(filename))
}

/// Load a JSON file from the feedsync config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    located()?.load_json(filename)
}

/// Save a value as JSON in the feedsync config directory
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<()> {
    located()?.save_json(filename, value)
}

fn located() -> Result<ConfigDir> {
    ConfigDir::locate().context("Could not determine config directory")
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Save a value as pretty-printed JSON to an arbitrary path
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_platform_dir_gets_app_suffix() {
        let dir = resolve(None, Some(PathBuf::from("/home/u/.config"))).unwrap();
        assert_eq!(dir.root(), Path::new("/home/u/.config/feedsync"));
        assert!(dir.path("reader.json").ends_with("feedsync/reader.json"));
    }

    #[test]
    fn test_override_wins() {
        let dir = resolve(
            Some(PathBuf::from("/tmp/portable")),
            Some(PathBuf::from("/home/u/.config")),
        )
        .unwrap();
        assert_eq!(dir.root(), Path::new("/tmp/portable"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let dir = resolve(Some(PathBuf::new()), Some(PathBuf::from("/etc/xdg"))).unwrap();
        assert_eq!(dir.root(), Path::new("/etc/xdg/feedsync"));
        assert!(resolve(Some(PathBuf::new()), None).is_none());
    }

    #[test]
    fn test_save_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ConfigDir::at(tmp.path().join("nested").join("feedsync"));
        let sample = Sample {
            name: "reader".to_string(),
            count: 3,
        };

        assert!(!dir.exists("sample.json"));
        dir.save_json("sample.json", &sample).unwrap();
        assert!(dir.exists("sample.json"));

        let loaded: Sample = dir.load_json("sample.json").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_missing_file_mentions_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ConfigDir::at(tmp.path())
            .load_json::<Sample>("missing.json")
            .unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_load_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_json_file::<Sample>(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
