use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{EaselError, EaselResult};

/// Tunables for the command engine.
///
/// Every field has a default, so a partial `config.toml` only overrides
/// what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of entries kept on the undo stack.
    pub history_limit: usize,
    /// Largest batch accepted by batch validation.
    pub max_batch_size: usize,
    /// Merge window for consecutive property edits on the same object.
    pub property_merge_window_ms: u64,
    /// Merge window for consecutive text edits on the same object.
    pub text_merge_window_ms: u64,
    /// Execution ids shorter than this are reported as weak.
    pub min_execution_id_length: usize,
    /// Command timestamps older than this are reported as stale.
    pub stale_timestamp_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_batch_size: 100,
            property_merge_window_ms: 500,
            text_merge_window_ms: 1000,
            min_execution_id_length: 8,
            stale_timestamp_secs: 3600,
        }
    }
}

impl EditorConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/easel/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("easel/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("easel\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the user config file, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                match Self::from_file(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Ignoring config at {}: {}", config_path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    pub fn from_file(path: &std::path::Path) -> EaselResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> EaselResult<Self> {
        toml::from_str(content).map_err(|e| EaselError::Serialization(e.to_string()))
    }

    pub fn property_merge_window(&self) -> Duration {
        Duration::from_millis(self.property_merge_window_ms)
    }

    pub fn text_merge_window(&self) -> Duration {
        Duration::from_millis(self.text_merge_window_ms)
    }

    pub fn stale_timestamp_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_timestamp_secs)
    }
}
