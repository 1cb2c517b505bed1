//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Jellyfin server URL
    pub server_url: String,
    /// API key for authentication (optional if using username/password)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Username for Jellyfin login
    #[serde(default)]
    pub username: Option<String>,
    /// User ID for Jellyfin requests
    #[serde(default)]
    pub user_id: Option<String>,
    /// Persistent device identifier announced to the server
    #[serde(default)]
    pub device_id: Option<String>,
    /// Key-value store holding local file resume points
    #[serde(default = "default_resume_store_path")]
    pub resume_store_path: PathBuf,
    /// Shared file read by the home-screen continue-watching extension
    #[serde(default = "default_continue_watching_path")]
    pub continue_watching_path: PathBuf,
    /// URL scheme used for continue-watching deep links
    #[serde(default = "default_deep_link_scheme")]
    pub deep_link_scheme: String,
    /// Progress reporting thresholds
    #[serde(default)]
    pub reporting: ReportingSettings,
}

/// Thresholds controlling how often playback progress is reported.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReportingSettings {
    /// Position jump (seconds) treated as a seek and reported at once
    pub seek_threshold_secs: u64,
    /// Position advance (seconds) that forces a progress report
    pub progress_interval_secs: u64,
    /// Wall-clock time (seconds) after which a progress report is due
    pub report_interval_secs: u64,
    /// Local files persist when the position is a multiple of this
    pub local_save_interval_secs: u64,
    /// Fraction of the duration at which playback counts as completed
    pub completion_threshold: f64,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        ReportingSettings {
            seek_threshold_secs: 3,
            progress_interval_secs: 10,
            report_interval_secs: 10,
            local_save_interval_secs: 10,
            completion_threshold: 0.95,
        }
    }
}

fn config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("jellyresume")
}

fn default_resume_store_path() -> PathBuf {
    config_dir().join("resume.json")
}

fn default_continue_watching_path() -> PathBuf {
    config_dir().join("continue_watching.json")
}

fn default_deep_link_scheme() -> String {
    "jellyresume".to_string()
}

/// Error types for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server_url: "http://localhost:8096".to_string(),
            api_key: None,
            username: None,
            user_id: None,
            device_id: None,
            resume_store_path: default_resume_store_path(),
            continue_watching_path: default_continue_watching_path(),
            deep_link_scheme: default_deep_link_scheme(),
            reporting: ReportingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Device identifier, derived from the hostname when none is configured.
    pub fn device_id_or_default(&self) -> String {
        self.device_id.clone().unwrap_or_else(|| {
            let host = hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string());
            format!("jellyresume-{}", host)
        })
    }

    /// Validate settings for server-backed playback
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.is_empty() {
            return Err(ConfigError::ValidationError("Server URL cannot be empty".to_string()));
        }

        if self.api_key.is_none() && self.username.is_none() {
            return Err(ConfigError::ValidationError(
                "Either API key or username must be provided".to_string(),
            ));
        }

        self.reporting.validate()
    }
}

impl ReportingSettings {
    /// Validate reporting thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seek_threshold_secs == 0 {
            return Err(ConfigError::ValidationError("Seek threshold must be at least 1 second".to_string()));
        }
        if self.local_save_interval_secs == 0 {
            return Err(ConfigError::ValidationError("Local save interval must be at least 1 second".to_string()));
        }
        if !(self.completion_threshold > 0.0 && self.completion_threshold <= 1.0) {
            return Err(ConfigError::ValidationError(
                "Completion threshold must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
