//! Error types for the exporter.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use crate::shelf::Shelf;
use thiserror::Error;

/// Main error type for scraping operations.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The required element isn't found in HTML
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The site did not accept the submitted credentials
    #[error("Login failed: {0}")]
    AuthenticationFailed(String),

    /// URL parsing or validation failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An embedded book payload did not match the expected shape
    #[error("Invalid book payload in item {index} of the {shelf} shelf: {source}")]
    Payload {
        shelf: Shelf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Resource missing or empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// Writing a downloaded resource failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScraperError {
    /// Returns true for failures worth retrying (currently only timeouts).
    pub fn is_transient(&self) -> bool {
        matches!(self, ScraperError::Timeout(_))
    }
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Error type for writing export files.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to create the directory or write a file
    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode JSON
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to encode CSV
    #[error("Failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A record did not serialize to a JSON object, so it has no columns
    #[error("Record {0} is not an object and cannot be written as a CSV row")]
    NotAnObject(usize),
}
