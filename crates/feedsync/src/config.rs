//! Settings for syncers and their HTTP stack
//!
//! Settings are loaded from (in order of priority):
//! 1. JSON file (~/.config/feedsync/reader.json)
//! 2. Runtime environment variable overrides (FEEDSYNC_*)
//! 3. Built-in defaults

use ::config::ConfigDir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings filename in the feedsync config directory
const SETTINGS_FILE: &str = "reader.json";

/// Which networks a syncer is allowed to use
///
/// The core only carries this selector; protocol bodies decide what to do
/// with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkProfile {
    #[default]
    Any,
    UnmeteredOnly,
    Offline,
}

/// Batch-size tuning for sync protocols
///
/// These are consumed by protocol implementations. Nothing in this crate
/// enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncLimits {
    /// Maximum number of unread counts requested in one pass
    pub unread_count: usize,
    /// Maximum number of items fetched globally in one pass
    pub global_items: usize,
    /// Maximum number of item ids fetched globally in one pass
    pub global_item_ids: usize,
    /// Items requested per page of an item list
    pub item_list_page: usize,
    /// Buffer size hint for protocols that stream large bodies
    pub content_io_buffer: usize,
}

impl SyncLimits {
    pub const UNREAD_COUNT_LIMIT: usize = 500;
    pub const GLOBAL_ITEMS_LIMIT: usize = 300;
    pub const GLOBAL_ITEM_IDS_LIMIT: usize = 600;
    pub const ITEM_LIST_QUERY_LIMIT: usize = 20;
    pub const CONTENT_IO_BUFFER_SIZE: usize = 16384;
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            unread_count: Self::UNREAD_COUNT_LIMIT,
            global_items: Self::GLOBAL_ITEMS_LIMIT,
            global_item_ids: Self::GLOBAL_ITEM_IDS_LIMIT,
            item_list_page: Self::ITEM_LIST_QUERY_LIMIT,
            content_io_buffer: Self::CONTENT_IO_BUFFER_SIZE,
        }
    }
}

/// Reader client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Prefer HTTPS when building query addresses
    pub https: bool,
    /// Network profile selector handed to syncers
    pub network: NetworkProfile,
    /// Global timeout for one HTTP request, in seconds
    pub timeout_secs: u64,
    /// Prefix placed before the token in the Authorization header
    pub auth_scheme: String,
    /// How long a fetched auth token is reused, in seconds
    pub token_freshness_secs: u64,
    pub limits: SyncLimits,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            https: true,
            network: NetworkProfile::Any,
            timeout_secs: 30,
            auth_scheme: "GoogleLogin auth=".to_string(),
            token_freshness_secs: crate::auth::TOKEN_FRESHNESS.as_secs(),
            limits: SyncLimits::default(),
        }
    }
}

impl ReaderSettings {
    /// Load settings from the config directory, then apply env overrides
    pub fn load() -> Result<Self> {
        match ConfigDir::locate() {
            Some(dir) => Self::load_from(&dir),
            None => Self::default().with_env_overrides(),
        }
    }

    /// Load settings from `dir`, falling back to defaults if the file is
    /// missing, then apply env overrides
    pub fn load_from(dir: &ConfigDir) -> Result<Self> {
        let settings = if dir.exists(SETTINGS_FILE) {
            dir.load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.with_env_overrides()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        ::config::load_json_file(path)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse reader settings JSON")
    }

    /// Persist settings to the config directory
    pub fn save(&self) -> Result<()> {
        ::config::save_json(SETTINGS_FILE, self)
    }

    /// Persist settings to `dir`
    pub fn save_to(&self, dir: &ConfigDir) -> Result<()> {
        dir.save_json(SETTINGS_FILE, self)
    }

    /// Get the default settings file path (~/.config/feedsync/reader.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        ::config::config_path(SETTINGS_FILE)
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token freshness window as a [`Duration`]
    pub fn token_freshness(&self) -> Duration {
        Duration::from_secs(self.token_freshness_secs)
    }

    fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FEEDSYNC_HTTPS") {
            self.https = value
                .parse()
                .with_context(|| format!("FEEDSYNC_HTTPS must be true or false, got {value:?}"))?;
        }
        if let Some(value) = lookup("FEEDSYNC_TIMEOUT_SECS") {
            self.timeout_secs = value
                .parse()
                .with_context(|| format!("FEEDSYNC_TIMEOUT_SECS is not a number: {value:?}"))?;
        }
        if let Some(value) = lookup("FEEDSYNC_AUTH_SCHEME") {
            self.auth_scheme = value;
        }
        Ok(self)
    }
}
