//! forecourt.toml handling
//!
//! ```toml
//! [combobox]
//! debounce_ms = 300
//! placeholder = "Select a device..."
//!
//! [lookup]
//! latency_ms = 120
//! fail_on = ["offline"]
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use forecourt_cn::ComboboxBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "forecourt.toml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct ForecourtConfig {
    #[serde(default)]
    pub combobox: ComboboxSettings,
    #[serde(default)]
    pub lookup: LookupSettings,
}

/// Combobox behaviour and texts
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ComboboxSettings {
    /// Quiet period before a lookup is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_search_placeholder")]
    pub search_placeholder: String,
    #[serde(default = "default_empty_text")]
    pub empty_text: String,
    #[serde(default = "default_loading_text")]
    pub loading_text: String,
    /// Committing the selected device again clears the selection
    #[serde(default = "default_true")]
    pub toggle_off: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_placeholder() -> String {
    "Select...".to_string()
}

fn default_search_placeholder() -> String {
    "Type to search...".to_string()
}

fn default_empty_text() -> String {
    "No results found".to_string()
}

fn default_loading_text() -> String {
    "Searching...".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ComboboxSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            placeholder: default_placeholder(),
            search_placeholder: default_search_placeholder(),
            empty_text: default_empty_text(),
            loading_text: default_loading_text(),
            toggle_off: true,
        }
    }
}

impl ComboboxSettings {
    /// Apply these settings to a builder
    pub fn apply(&self, builder: ComboboxBuilder) -> ComboboxBuilder {
        builder
            .debounce(Duration::from_millis(self.debounce_ms))
            .placeholder(self.placeholder.as_str())
            .search_placeholder(self.search_placeholder.as_str())
            .empty_text(self.empty_text.as_str())
            .loading_text(self.loading_text.as_str())
            .toggle_off(self.toggle_off)
    }
}

/// The simulated device lookup used by `pick --dynamic`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LookupSettings {
    /// How long each lookup takes
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Queries that fail instead of answering
    #[serde(default)]
    pub fail_on: Vec<String>,
}

fn default_latency_ms() -> u64 {
    120
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            fail_on: Vec::new(),
        }
    }
}

impl ForecourtConfig {
    /// Load `forecourt.toml` from a directory, or the defaults if it has none
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = path.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, path.display());
            return Ok(Self::default());
        }
        Self::load(&config_path)
    }

    /// Load an explicit config file; it must exist
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
