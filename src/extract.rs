//! Book extraction from shelf listings.
//!
//! Each book node on a listing holds a JSON payload in the `data-modal`
//! attribute of a nested element. The finished listing embeds review data,
//! the thumbnail listings only book metadata.

use crate::error::ScraperError;
use crate::records::{Book, BookRecord, ReviewPayload, ReviewedBook, ThumbnailPayload};
use crate::shelf::{RecordShape, Shelf};
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

/// Attribute carrying the JSON payload.
const PAYLOAD_ATTR: &str = "data-modal";

/// CSS selectors used for parsing.
struct Selectors {
    /// Book rows of the finished listing (list layout).
    review_row: Selector,
    /// Payload holder within a review row.
    review_payload: Selector,
    /// Book thumbnails of the other listings.
    thumbnail: Selector,
    /// Payload holder within a thumbnail.
    thumbnail_payload: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            review_row: Selector::parse(".book-list__group .book__detail").unwrap(),
            review_payload: Selector::parse(".detail__edit > div").unwrap(),
            thumbnail: Selector::parse(".books .book__thumbnail").unwrap(),
            thumbnail_payload: Selector::parse(".thumbnail__action > div").unwrap(),
        }
    }
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// Extracts every book on the listing page, in document order.
///
/// One bad node fails the whole page; there is no per-item recovery.
pub fn extract_records(doc: &Html, shelf: Shelf) -> Result<Vec<BookRecord>, ScraperError> {
    match shelf.shape() {
        RecordShape::Reviewed => doc
            .select(&SELECTORS.review_row)
            .enumerate()
            .map(|(index, row)| -> Result<BookRecord, ScraperError> {
                let payload: ReviewPayload =
                    read_payload(row, &SELECTORS.review_payload, shelf, index)?;
                Ok(BookRecord::Reviewed(ReviewedBook::from(payload)))
            })
            .collect(),
        RecordShape::Plain => doc
            .select(&SELECTORS.thumbnail)
            .enumerate()
            .map(|(index, thumbnail)| -> Result<BookRecord, ScraperError> {
                let payload: ThumbnailPayload =
                    read_payload(thumbnail, &SELECTORS.thumbnail_payload, shelf, index)?;
                Ok(BookRecord::Plain(Book::from(payload)))
            })
            .collect(),
    }
}

fn read_payload<T: DeserializeOwned>(
    node: ElementRef,
    holder: &Selector,
    shelf: Shelf,
    index: usize,
) -> Result<T, ScraperError> {
    let raw = node
        .select(holder)
        .next()
        .and_then(|elem| elem.value().attr(PAYLOAD_ATTR))
        .ok_or_else(|| {
            ScraperError::ElementNotFound(format!(
                "{} payload of item {} on the {} shelf",
                PAYLOAD_ATTR, index, shelf
            ))
        })?;

    serde_json::from_str(raw).map_err(|source| ScraperError::Payload {
        shelf,
        index,
        source,
    })
}
