//! Utility functions for common operations.

use crate::error::ScraperError;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use scraper::ElementRef;
use url::Url;

/// Collects an element's text content and trims surrounding whitespace.
pub fn element_text(elem: ElementRef) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// Resolves an `href`/`src`/`action` value against the page it came from.
pub fn resolve_url(base: &Url, relative: &str) -> Result<Url, ScraperError> {
    base.join(relative)
        .map_err(|e| ScraperError::InvalidUrl(format!("{} (relative to {}): {}", relative, base, e)))
}

/// Maps a reqwest failure to a scraper error, keeping timeouts distinguishable.
pub fn request_error(err: reqwest::Error, url: &Url) -> ScraperError {
    if err.is_timeout() {
        ScraperError::Timeout(url.to_string())
    } else {
        ScraperError::HttpError(err)
    }
}

/// Returns the extension of the URL's final path segment, if it has one.
pub fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}

/// Derives a file extension from an `image/*` content type.
pub fn content_type_extension(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type.split(';').next()?.trim();
    let subtype = essence.strip_prefix("image/")?;
    match subtype {
        "" => None,
        "jpeg" => Some("jpg".to_string()),
        "svg+xml" => Some("svg".to_string()),
        other => Some(other.to_ascii_lowercase()),
    }
}
