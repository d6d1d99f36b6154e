//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Everything here describes *behavior* (where to scrape, how patiently,
/// how often to poll). Credentials live separately in the env file, see
/// [`crate::config::ChannelConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source page and extraction settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Background scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// State persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(AppError::config("source.url is empty"));
        }
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::config("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::config("source.timeout_secs must be > 0"));
        }
        if self.source.container_selector.trim().is_empty() {
            return Err(AppError::config("source.container_selector is empty"));
        }
        if self.source.item_selector.trim().is_empty() {
            return Err(AppError::config("source.item_selector is empty"));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(AppError::config("scheduler.poll_interval_secs must be > 0"));
        }
        if self.storage.state_file.trim().is_empty() {
            return Err(AppError::config("storage.state_file is empty"));
        }
        Ok(())
    }
}

/// Source page and HTML extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the notification page
    #[serde(default = "defaults::url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// CSS selector for the announcements container
    #[serde(default = "defaults::container_selector")]
    pub container_selector: String,

    /// CSS selector for one announcement row within the container
    #[serde(default = "defaults::item_selector")]
    pub item_selector: String,

    /// CSS selector for the title anchor within a row
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            container_selector: defaults::container_selector(),
            item_selector: defaults::item_selector(),
            link_selector: defaults::link_selector(),
        }
    }
}

/// Background scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between "is it time yet" checks of the polling loop
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
        }
    }
}

/// State persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the state file
    #[serde(default = "defaults::state_dir")]
    pub state_dir: String,

    /// State file name
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: defaults::state_dir(),
            state_file: defaults::state_file(),
        }
    }
}

mod defaults {
    // Source defaults match the SDE notification page structure.
    pub fn url() -> String {
        "https://b-u.ac.in/notifications/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sde-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn container_selector() -> String {
        "div.admissions_contents".into()
    }
    pub fn item_selector() -> String {
        "div.views-field-title".into()
    }
    pub fn link_selector() -> String {
        "span.field-content a".into()
    }

    // Scheduler defaults
    pub fn poll_interval() -> u64 {
        10
    }

    // Storage defaults
    pub fn state_dir() -> String {
        ".".into()
    }
    pub fn state_file() -> String {
        "previous_data.json".into()
    }
}
