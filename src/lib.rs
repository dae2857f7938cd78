//! Bookmeter exporter.
//!
//! This library provides functionality for:
//! - Signing into a Bookmeter account with its own login form
//! - Walking the paginated shelf listings and reading the embedded book payloads
//! - Writing shelves and the profile as JSON and CSV, plus the profile icon

pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod extract;
pub mod paginate;
pub mod profile;
pub mod records;
pub mod session;
pub mod shelf;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use console::Console;
pub use error::{ConfigError, ExportError, ScraperError};
pub use export::Exporter;
pub use paginate::Paginator;
pub use records::{Book, BookRecord, Profile, ReviewedBook};
pub use session::{AccountId, Page, PageFetcher, Session};
pub use shelf::Shelf;
