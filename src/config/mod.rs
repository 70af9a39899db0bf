//! Configuration management.
//!
//! Settings live in `~/.issuetracker/config.json` and can be overridden by
//! environment variables and command-line flags.
//!
//! Priority for every setting:
//! 1. Explicit flag (`--api-url`, `--token`)
//! 2. Environment variable (`ITL_API_URL`, `ITL_TOKEN`, `ITL_PAGE_SIZE`,
//!    `ITL_RECONNECT_RETRIES`)
//! 3. Config file
//! 4. Built-in default

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stream::{ReconnectPolicy, TokenSource};
use crate::stream::backoff::{DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS};
use crate::view::DEFAULT_PAGE_SIZE;

/// API base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<ReconnectSettings>,
}

/// `reconnect` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

/// Get the global config directory.
///
/// `ITL_CONFIG_DIR` overrides the default `~/.issuetracker/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("ITL_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".issuetracker"))
}

/// Path of `config.json`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    global_config_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the config file, or defaults if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<ItlConfig> {
    load_config_from(&config_path()?)
}

/// Load a config file from an explicit path.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<ItlConfig> {
    if !path.exists() {
        return Ok(ItlConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the config file.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config(config: &ItlConfig) -> Result<PathBuf> {
    let path = config_path()?;
    save_config_to(&path, config)?;
    Ok(path)
}

/// Save a config file to an explicit path.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_to(path: &Path, config: &ItlConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

/// Delete the config file. Returns whether one existed.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn reset_config() -> Result<bool> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).map_err(|e| Error::Config(format!("Failed to remove config file: {e}")))?;
    Ok(true)
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub reconnect: ReconnectPolicy,
}

impl Settings {
    /// Resolve from flags, the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable config file or invalid values.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = load_config()?;
        Self::resolve(overrides, &file, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unparseable numeric values or a zero page size.
    pub fn resolve<F>(overrides: &Overrides, file: &ItlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let api_url = non_blank(overrides.api_url.clone())
            .or_else(|| env("ITL_API_URL"))
            .or_else(|| non_blank(file.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let token = non_blank(overrides.token.clone())
            .or_else(|| env("ITL_TOKEN"))
            .or_else(|| non_blank(file.token.clone()));

        let page_size = match env("ITL_PAGE_SIZE") {
            Some(raw) => parse_number::<u32>("ITL_PAGE_SIZE", &raw)?,
            None => file.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        if page_size == 0 {
            return Err(Error::Config("page size must be at least 1".into()));
        }

        let section = file.reconnect.clone().unwrap_or_default();
        let max_retries = match env("ITL_RECONNECT_RETRIES") {
            Some(raw) => parse_number::<u32>("ITL_RECONNECT_RETRIES", &raw)?,
            None => section.max_retries.unwrap_or(0),
        };
        let reconnect = ReconnectPolicy {
            max_retries,
            initial_delay: Duration::from_millis(
                section.initial_delay_ms.unwrap_or(DEFAULT_INITIAL_DELAY_MS),
            ),
            max_delay: Duration::from_millis(section.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS)),
            jitter: true,
        };

        Ok(Self {
            api_url,
            token,
            page_size,
            reconnect,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got '{raw}'")))
}

/// Token source backed by the resolved settings.
///
/// The token is captured once at resolution time.
#[derive(Debug, Clone)]
pub struct SettingsToken(Option<String>);

impl From<&Settings> for SettingsToken {
    fn from(settings: &Settings) -> Self {
        Self(settings.token.clone())
    }
}

impl TokenSource for SettingsToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Mask a token for display: first four characters, then `…`.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}…")
    }
}
