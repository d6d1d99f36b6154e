// src/config.rs

//! Channel configuration backed by an env-style file.
//!
//! Credentials and the daily notification time live in a `.env`-format file
//! so they can be edited (by hand or through the CLI) without touching the
//! behavior config. The file is re-read before every cycle and at every
//! scheduler start, so edits take effect on the next run without a restart.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveTime};

use crate::error::{AppError, Result};

/// Env key for the Telegram bot token.
pub const KEY_TOKEN: &str = "TELEGRAM_TOKEN";
/// Env key for the Telegram chat identifier.
pub const KEY_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
/// Env key for the daily notification time (`HH:MM`, 24-hour).
pub const KEY_TIME: &str = "NOTIFICATION_TIME";

/// Credentials and schedule for the outbound channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Telegram bot token
    pub bot_token: String,

    /// Telegram chat identifier
    pub chat_id: String,

    /// Daily notification time, `HH:MM` 24-hour
    pub daily_time: String,
}

impl ChannelConfig {
    /// Read the channel configuration from the env file.
    ///
    /// Missing file or missing keys fall back to the process environment,
    /// then to empty values (and the current time for the schedule). This
    /// never fails: an unreadable file is a configuration-incomplete state,
    /// surfaced later when delivery is attempted.
    pub fn load(path: &Path) -> Self {
        let mut file_vars: HashMap<String, String> = HashMap::new();
        match dotenvy::from_path_iter(path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            file_vars.insert(key, value);
                        }
                        Err(e) => log::warn!("Skipping malformed line in {:?}: {}", path, e),
                    }
                }
            }
            Err(e) => log::debug!("Env file {:?} not readable: {}", path, e),
        }

        let lookup = |key: &str| {
            file_vars
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let mut daily_time = lookup(KEY_TIME);
        if daily_time.is_empty() {
            daily_time = Local::now().format("%H:%M").to_string();
        }

        Self {
            bot_token: lookup(KEY_TOKEN),
            chat_id: lookup(KEY_CHAT_ID),
            daily_time,
        }
    }

    /// Both credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Parse the configured daily time.
    pub fn daily_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.daily_time, "%H:%M").map_err(|e| {
            AppError::config(format!(
                "Invalid {} '{}': {} (expected HH:MM)",
                KEY_TIME, self.daily_time, e
            ))
        })
    }
}

/// Create the env file with placeholder values if it does not exist.
pub fn ensure_default(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let now = Local::now().format("%H:%M");
    let content = format!("{KEY_TOKEN}=\n{KEY_CHAT_ID}=\n{KEY_TIME}={now}\n");
    fs::write(path, content)?;
    log::info!(
        "Created default env file at {:?}. Update it with your credentials.",
        path
    );
    Ok(())
}

/// Update a single key in the env file, preserving all other lines.
///
/// The key is appended if not present. The file is created first when
/// missing.
pub fn update_key(path: &Path, key: &str, value: &str) -> Result<()> {
    ensure_default(path)?;

    let content = fs::read_to_string(path)?;
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let prefix = format!("{key}=");
    let mut found = false;
    for line in lines.iter_mut() {
        if line.trim_start().starts_with(&prefix) {
            *line = format!("{key}={value}");
            found = true;
            break;
        }
    }
    if !found {
        lines.push(format!("{key}={value}"));
    }

    fs::write(path, lines.join("\n") + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_path(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join(".env")
    }

    #[test]
    fn load_reads_all_keys() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(
            &path,
            "TELEGRAM_TOKEN=123:abc\nTELEGRAM_CHAT_ID=42\nNOTIFICATION_TIME=09:30\n",
        )
        .unwrap();

        let config = ChannelConfig::load(&path);
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.chat_id, "42");
        assert_eq!(config.daily_time, "09:30");
        assert!(config.has_credentials());
    }

    #[test]
    fn load_missing_file_yields_empty_credentials() {
        let dir = TempDir::new().unwrap();
        let config = ChannelConfig::load(&env_path(&dir));
        assert!(!config.has_credentials());
        // Falls back to the current time, which always parses.
        assert!(config.daily_time().is_ok());
    }

    #[test]
    fn daily_time_rejects_garbage() {
        let config = ChannelConfig {
            daily_time: "25:99".to_string(),
            ..Default::default()
        };
        assert!(config.daily_time().is_err());

        let config = ChannelConfig {
            daily_time: "soon".to_string(),
            ..Default::default()
        };
        assert!(config.daily_time().is_err());
    }

    #[test]
    fn daily_time_parses_valid() {
        let config = ChannelConfig {
            daily_time: "09:30".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.daily_time().unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
    }

    #[test]
    fn ensure_default_creates_once() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);

        ensure_default(&path).unwrap();
        assert!(path.exists());

        // A second call must not clobber edits.
        update_key(&path, KEY_TOKEN, "kept").unwrap();
        ensure_default(&path).unwrap();
        assert_eq!(ChannelConfig::load(&path).bot_token, "kept");
    }

    #[test]
    fn update_key_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(
            &path,
            "TELEGRAM_TOKEN=old\nTELEGRAM_CHAT_ID=42\nNOTIFICATION_TIME=09:30\n",
        )
        .unwrap();

        update_key(&path, KEY_TOKEN, "new").unwrap();

        let config = ChannelConfig::load(&path);
        assert_eq!(config.bot_token, "new");
        assert_eq!(config.chat_id, "42");
        assert_eq!(config.daily_time, "09:30");
    }

    #[test]
    fn update_key_appends_missing() {
        let dir = TempDir::new().unwrap();
        let path = env_path(&dir);
        fs::write(&path, "TELEGRAM_TOKEN=t\n").unwrap();

        update_key(&path, KEY_CHAT_ID, "7").unwrap();
        assert_eq!(ChannelConfig::load(&path).chat_id, "7");
        // Untouched keys survive the rewrite.
        assert_eq!(ChannelConfig::load(&path).bot_token, "t");
    }
}
