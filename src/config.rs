//! Configuration - paths, timezone, and parsing/dispatch settings

use crate::error::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// All injected configuration. Loadable from a JSON file; every field has a
/// default so partial files work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the reminders table
    pub db_path: PathBuf,
    /// Reference timezone for parsing, listing, and digest windows
    pub timezone: Tz,
    /// Local hour at/after which the daily digest becomes due
    pub digest_hour: u32,
    /// Default local hour for "tonight" with no explicit time
    pub evening_hour: u32,
    /// Inclusive range of bare hours assumed PM when no meridiem is given
    pub afternoon_hours: (u32, u32),
    /// Dispatcher tick interval in seconds
    pub tick_interval_secs: u64,
    /// Identities allowed to manage the owner's reminders
    pub circle: Vec<String>,
    /// Owner that circle members act on behalf of
    pub owner: Option<String>,
    /// Command spawned to deliver notifications: `<cmd> <owner> <message>`
    pub notify_cmd: Option<PathBuf>,
    /// Webhook POSTed to deliver notifications as JSON `{"to", "body"}`
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            db_path: home.join(".nudge-assistant/reminders.db"),
            timezone: chrono_tz::UTC,
            digest_hour: 8,
            evening_hour: 20,
            afternoon_hours: (1, 7),
            tick_interval_secs: 30,
            circle: Vec::new(),
            owner: None,
            notify_cmd: None,
            webhook_url: None,
        }
    }
}

impl Config {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from the given path, or fall back to defaults when none is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Create config for testing with a temp-dir database and a fast tick
    pub fn for_test(temp_dir: &Path) -> Self {
        Self {
            db_path: temp_dir.join("reminders.db"),
            tick_interval_secs: 1,
            ..Self::default()
        }
    }
}
