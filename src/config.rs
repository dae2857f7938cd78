//! Configuration management.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Application name used for config directory.
const APP_NAME: &str = "bookmeter-export";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target site settings.
    pub site: SiteConfig,

    /// Web scraping settings.
    pub scraping: ScrapingConfig,

    /// File paths.
    pub paths: PathsConfig,
}

/// Target site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL of the site; login and user pages are resolved against it.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bookmeter.com".to_string(),
        }
    }
}

impl SiteConfig {
    /// Parses the configured base URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "site.base_url".to_string(),
            message: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidValue {
                key: "site.base_url".to_string(),
                message: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Web scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Delay before every web request in seconds.
    pub delay_between_requests_sec: f64,

    /// Per-request timeout in seconds.
    pub request_timeout_sec: u64,

    /// How often a timed-out next page is retried before giving up.
    pub page_retries: u32,

    /// Upper bound on pages followed within one shelf.
    pub max_pages: u32,

    /// Enable scraper debug logging.
    pub debug: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            delay_between_requests_sec: 1.0,
            request_timeout_sec: 10,
            page_retries: 2,
            max_pages: 500,
            debug: false,
        }
    }
}

/// File path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory that receives the exported files.
    pub output_directory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("export"),
        }
    }
}

/// Account credentials for the login form.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Builds credentials, rejecting blank values.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let email = email.into();
        let password = password.into();

        if email.trim().is_empty() {
            return Err(ConfigError::MissingValue("EMAIL".to_string()));
        }
        if password.is_empty() {
            return Err(ConfigError::MissingValue("PASSWORD".to_string()));
        }

        Ok(Self { email, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site.url()?;

        if self.scraping.request_timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.request_timeout_sec".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.scraping.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.max_pages".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.scraping.delay_between_requests_sec < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.delay_between_requests_sec".to_string(),
                message: "must not be negative".to_string(),
            });
        }

        Ok(())
    }
}
