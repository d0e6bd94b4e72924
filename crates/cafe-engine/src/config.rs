//! Configuration types for the cafe engine.
//!
//! This module defines where the remote endpoints live, which reply and
//! upload modes the widgets run in, and the timings of the simulated
//! variants.

use crate::conversation::ConversationSettings;
use crate::upload::UploadSettings;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`Config::base_url`].
pub const ENV_BASE_URL: &str = "CAFE_API_BASE_URL";

/// Environment variable overriding [`Config::user_id`].
pub const ENV_USER_ID: &str = "CAFE_USER_ID";

/// Main configuration for cafe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL both endpoints are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the coffee-expert chat endpoint.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    /// Path of the roast-analysis endpoint.
    #[serde(default = "default_analysis_path")]
    pub analysis_path: String,

    /// Constant user id sent with every chat request.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// How the chat widget produces replies.
    #[serde(default)]
    pub chat_mode: ChatMode,

    /// How the upload widget handles a submission.
    #[serde(default)]
    pub upload_mode: UploadMode,

    /// Artificial delay range for canned replies, in milliseconds.
    #[serde(default)]
    pub canned_delay_ms: DelayRange,

    /// Artificial upload time in simulated mode, in milliseconds.
    #[serde(default = "default_simulated_upload_ms")]
    pub simulated_upload_ms: u64,

    /// How long the success state stays up before the form resets.
    #[serde(default = "default_success_reset_ms")]
    pub success_reset_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_chat_path() -> String {
    "/coffee-expert/".into()
}

fn default_analysis_path() -> String {
    "/analyze-roast/".into()
}

fn default_user_id() -> String {
    "web_user".into()
}

fn default_simulated_upload_ms() -> u64 {
    2000
}

fn default_success_reset_ms() -> u64 {
    3000
}

/// Reply source for the chat widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Forward questions to the coffee-expert endpoint.
    #[default]
    Remote,
    /// Answer locally from keyword-matched canned replies.
    Canned,
}

/// Submission behaviour of the upload widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Upload the image to the roast-analysis endpoint.
    #[default]
    Remote,
    /// Pretend to upload, then show success without a result.
    Simulated,
}

/// Inclusive millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: 1000,
            max: 2000,
        }
    }
}

impl DelayRange {
    /// A range that always yields the same delay.
    pub const fn fixed(ms: u64) -> Self {
        Self { min: ms, max: ms }
    }

    /// The range as durations, with `min <= max` enforced.
    pub fn as_durations(self) -> (Duration, Duration) {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, falling back to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Default config location (`<config_dir>/cafe/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cafe").join("config.json"))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(user) = lookup(ENV_USER_ID).filter(|v| !v.trim().is_empty()) {
            self.user_id = user.trim().to_string();
        }
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> Result<Url, ConfigError> {
        self.endpoint(&self.chat_path)
    }

    /// Full URL of the analysis endpoint.
    pub fn analysis_url(&self) -> Result<Url, ConfigError> {
        self.endpoint(&self.analysis_path)
    }

    /// Join `path` under the base URL, keeping any path prefix the base has.
    fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ConfigError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Settings for a new conversation widget.
    pub fn conversation_settings(&self) -> ConversationSettings {
        ConversationSettings {
            mode: self.chat_mode,
            user_id: self.user_id.clone(),
            canned_delay: self.canned_delay_ms.as_durations(),
        }
    }

    /// Settings for a new upload widget.
    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            mode: self.upload_mode,
            simulated_delay: Duration::from_millis(self.simulated_upload_ms),
            reset_after: Duration::from_millis(self.success_reset_ms),
        }
    }

    /// A config that never touches the network and never waits.
    pub fn offline() -> Self {
        Self {
            chat_mode: ChatMode::Canned,
            upload_mode: UploadMode::Simulated,
            canned_delay_ms: DelayRange::fixed(0),
            simulated_upload_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            analysis_path: default_analysis_path(),
            user_id: default_user_id(),
            chat_mode: ChatMode::default(),
            upload_mode: UploadMode::default(),
            canned_delay_ms: DelayRange::default(),
            simulated_upload_ms: default_simulated_upload_ms(),
            success_reset_ms: default_success_reset_ms(),
        }
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Base URL or endpoint path does not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chat_mode, ChatMode::Remote);
        assert_eq!(config.upload_mode, UploadMode::Remote);
        assert_eq!(config.user_id, "web_user");
        assert_eq!(config.success_reset_ms, 3000);
        assert_eq!(config.canned_delay_ms, DelayRange { min: 1000, max: 2000 });
    }

    #[test]
    fn test_endpoint_urls() {
        let mut config = Config::default();
        config.base_url = "https://coffee.example.com".into();
        assert_eq!(
            config.chat_url().unwrap().as_str(),
            "https://coffee.example.com/coffee-expert/"
        );
        assert_eq!(
            config.analysis_url().unwrap().as_str(),
            "https://coffee.example.com/analyze-roast/"
        );
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let mut config = Config::default();
        config.base_url = "https://host.example.com/api".into();
        assert_eq!(
            config.chat_url().unwrap().as_str(),
            "https://host.example.com/api/coffee-expert/"
        );

        config.base_url = "https://host.example.com/api/".into();
        assert_eq!(
            config.analysis_url().unwrap().as_str(),
            "https://host.example.com/api/analyze-roast/"
        );

        config.base_url = "http://127.0.0.1:8000/".into();
        assert_eq!(
            config.chat_url().unwrap().as_str(),
            "http://127.0.0.1:8000/coffee-expert/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.base_url = "not a url".into();
        assert!(matches!(config.chat_url(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"chat_mode":"canned"}"#).unwrap();
        assert_eq!(parsed.chat_mode, ChatMode::Canned);
        assert_eq!(parsed.chat_path, "/coffee-expert/");
        assert_eq!(parsed.simulated_upload_ms, 2000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.upload_mode = UploadMode::Simulated;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_BASE_URL => Some(" https://api.example.com ".into()),
            ENV_USER_ID => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.user_id, "web_user");
    }

    #[test]
    fn test_delay_range_orders_bounds() {
        let (lo, hi) = DelayRange { min: 900, max: 100 }.as_durations();
        assert_eq!(lo, Duration::from_millis(100));
        assert_eq!(hi, Duration::from_millis(900));
    }
}
