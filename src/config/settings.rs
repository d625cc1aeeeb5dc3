//! Persisted settings, including the sync watermark.
//!
//! Settings live in a single JSON file (`~/.things-logbook/config.json` by
//! default). Keys are camelCase so the file stays compatible with the
//! Obsidian plugin's `data.json`. Missing keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::things::Watermark;

pub const DEFAULT_SECTION_HEADING: &str = "## Logbook";
pub const DEFAULT_SYNC_FREQUENCY_SECONDS: u64 = 30 * 60;
pub const DEFAULT_TAG_PREFIX: &str = "logbook/";
pub const DEFAULT_CANCELLED_MARK: &str = "c";
pub const DEFAULT_TABLE_FORMAT: &str = "TAg";
pub const DEFAULT_DAILY_NOTE_FORMAT: &str = "%Y-%m-%d";

/// Settings that may be unset; setting them to "" clears them.
const OPTIONAL_KEYS: [&str; 2] = ["thingsDbPath", "vaultPath"];

/// User-editable options plus the last sync time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub has_accepted_disclaimer: bool,
    pub latest_sync_time: Watermark,

    pub does_sync_note_body: bool,
    pub is_sync_enabled: bool,
    pub section_heading: String,
    /// Seconds between passes in watch mode.
    pub sync_interval: u64,
    pub tag_prefix: String,
    pub canceled_mark: String,
    pub include_tags: bool,
    pub include_headers: bool,
    pub render_checklists: bool,
    pub alternative_checkbox_prefix: String,
    pub render_as_table: bool,
    pub table_format_definition: String,

    pub things_db_path: Option<PathBuf>,
    pub vault_path: Option<PathBuf>,
    /// Folder inside the vault holding daily notes.
    pub daily_note_folder: String,
    /// `chrono` format string for daily note file names.
    pub daily_note_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            has_accepted_disclaimer: false,
            latest_sync_time: Watermark::ZERO,
            does_sync_note_body: true,
            is_sync_enabled: false,
            section_heading: DEFAULT_SECTION_HEADING.to_string(),
            sync_interval: DEFAULT_SYNC_FREQUENCY_SECONDS,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            canceled_mark: DEFAULT_CANCELLED_MARK.to_string(),
            include_tags: true,
            include_headers: true,
            render_checklists: true,
            alternative_checkbox_prefix: String::new(),
            render_as_table: false,
            table_format_definition: DEFAULT_TABLE_FORMAT.to_string(),
            things_db_path: None,
            vault_path: None,
            daily_note_folder: String::new(),
            daily_note_format: DEFAULT_DAILY_NOTE_FORMAT.to_string(),
        }
    }
}

impl Settings {
    /// Setting names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized.
    pub fn keys(&self) -> Result<Vec<String>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map.keys().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Read one setting as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] if `key` is not a setting name.
    pub fn get(&self, key: &str) -> Result<serde_json::Value> {
        let value = serde_json::to_value(self)?;
        value
            .get(key)
            .cloned()
            .ok_or_else(|| Error::UnknownSetting { key: key.to_string() })
    }

    /// Update one setting from its textual form.
    ///
    /// The text is parsed according to the current value's type: `true`/`false`
    /// for flags, a number for numeric settings, and the raw text otherwise.
    /// An empty string clears an optional path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for an unknown key and
    /// [`Error::InvalidArgument`] if the text does not parse.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut value = serde_json::to_value(&*self)?;
        let map = value
            .as_object_mut()
            .ok_or_else(|| Error::Other("settings are not a JSON object".to_string()))?;
        let current = map
            .get(key)
            .ok_or_else(|| Error::UnknownSetting { key: key.to_string() })?;

        let parsed = match current {
            serde_json::Value::Bool(_) => {
                let flag = parse_flag(raw).ok_or_else(|| {
                    Error::InvalidArgument(format!("{key} expects true or false, got '{raw}'"))
                })?;
                serde_json::Value::Bool(flag)
            }
            serde_json::Value::Number(_) => {
                let number: serde_json::Number = raw.trim().parse().map_err(|_| {
                    Error::InvalidArgument(format!("{key} expects a number, got '{raw}'"))
                })?;
                serde_json::Value::Number(number)
            }
            _ if raw.trim().is_empty() && OPTIONAL_KEYS.contains(&key) => serde_json::Value::Null,
            _ if key == "sectionHeading" => serde_json::Value::String(raw.trim().to_string()),
            _ => serde_json::Value::String(raw.to_string()),
        };

        map.insert(key.to_string(), parsed);
        *self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidArgument(format!("invalid value for {key}: {e}")))?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Settings file on disk.
///
/// The watermark is owned by the caller of a pass; this store only persists
/// it when told to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, or defaults if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {e}")))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings file: {e}")))
    }

    /// Write settings, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {e}")))?;

        crate::notes::atomic_write(&self.path, &content)
            .map_err(|e| Error::Config(format!("Failed to write settings file: {e}")))
    }

    /// Persist a new watermark after a successful pass.
    ///
    /// Re-reads the file first so options edited while the pass ran are kept.
    /// A watermark older than the stored one is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or written.
    pub fn record_watermark(&self, watermark: Watermark) -> Result<Settings> {
        let mut settings = self.load()?;
        if watermark > settings.latest_sync_time {
            settings.latest_sync_time = watermark;
            self.save(&settings)?;
            debug!(%watermark, "Recorded sync watermark");
        }
        Ok(settings)
    }
}
