//! Configuration loading for chatgate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the chatgate home directory (~/.chatgate).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".chatgate"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.chatgate/settings.json
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load and validate settings from an explicit path.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Reject settings the daemon cannot run with.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.concurrency.max_concurrent_conversations == 0 {
        return Err(Error::Config(
            "concurrency.max_concurrent_conversations must be a positive integer".to_string(),
        ));
    }

    if settings.orchestrator.timeout_secs == 0 {
        return Err(Error::Config(
            "orchestrator.timeout_secs must be a positive integer".to_string(),
        ));
    }

    Ok(())
}

/// Load settings, falling back to defaults only when no settings file exists.
///
/// A file that fails to parse or validate is an error.
pub fn load_settings_or_default() -> Result<Settings> {
    load_settings_or_default_from(&get_settings_path()?)
}

pub fn load_settings_or_default_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::info!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    load_settings_from(path)
}

/// Concurrency limits.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Concurrency {
    #[serde(default = "default_max_concurrent_conversations")]
    pub max_concurrent_conversations: usize,
}

fn default_max_concurrent_conversations() -> usize {
    10
}

impl Default for Concurrency {
    fn default() -> Self {
        Self {
            max_concurrent_conversations: default_max_concurrent_conversations(),
        }
    }
}

/// Channel configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChannelConfig {
    pub bot_token: Option<String>,
}

/// Channels configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Channels {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub telegram: ChannelConfig,
}

impl Channels {
    pub fn is_enabled(&self, channel: &str) -> bool {
        self.enabled.iter().any(|c| c == channel)
    }
}

/// HTTP server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Web {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3333
}

impl Default for Web {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Provider model configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProviderModel {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Models configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Models {
    #[serde(default)]
    pub provider: String,
    pub model: Option<String>,
    #[serde(default)]
    pub ollama: ProviderModel,
}

/// Orchestrator configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Orchestrator {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    pub working_directory: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    600
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            working_directory: None,
        }
    }
}

/// chatgate settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub concurrency: Concurrency,

    #[serde(default)]
    pub channels: Channels,

    #[serde(default)]
    pub web: Web,

    #[serde(default)]
    pub models: Models,

    #[serde(default)]
    pub orchestrator: Orchestrator,
}
