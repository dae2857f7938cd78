//! Exported record types and the payload schemas they are read from.
//!
//! Book nodes on a listing carry a JSON document in their `data-modal`
//! attribute. The payload structs below mirror that document; the exported
//! structs are the flattened, camelCase shape written to disk.

use serde::{Deserialize, Serialize};

/// A book on any shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_author: Option<String>,
    pub book_page: u32,
    pub book_id: u64,
    pub book_asin: String,
    pub book_title: String,
    pub book_image_url: String,
}

/// A finished book together with the reader's review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedBook {
    #[serde(flatten)]
    pub book: Book,
    pub review_date: String,
    pub review_text: Option<String>,
    pub review_is_spoiler: Option<bool>,
    pub review_is_draft: bool,
    pub bookcase_names: Vec<String>,
}

/// One extracted entry; a shelf always yields a single variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BookRecord {
    Plain(Book),
    Reviewed(ReviewedBook),
}

impl BookRecord {
    /// The book metadata shared by both variants.
    #[cfg(test)]
    pub(crate) fn book(&self) -> &Book {
        match self {
            BookRecord::Plain(book) => book,
            BookRecord::Reviewed(reviewed) => &reviewed.book,
        }
    }
}

/// The account's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub icon_url: String,
    pub registration_date: String,
    pub first_recording_date: String,
}

/// Payload embedded in the finished listing (`.detail__edit > div`).
#[derive(Debug, Deserialize)]
pub(crate) struct ReviewPayload {
    author: Option<String>,
    pages: u32,
    book: ReviewPayloadBook,
    review: ReviewPayloadReview,
    #[serde(default)]
    bookcases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewPayloadBook {
    id: u64,
    asin: String,
    title: String,
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct ReviewPayloadReview {
    text: Option<String>,
    is_netabare: Option<bool>,
    read_at: String,
    is_draft: bool,
}

impl From<ReviewPayload> for ReviewedBook {
    fn from(payload: ReviewPayload) -> Self {
        Self {
            book: Book {
                book_author: payload.author,
                book_page: payload.pages,
                book_id: payload.book.id,
                book_asin: payload.book.asin,
                book_title: payload.book.title,
                book_image_url: payload.book.image_url,
            },
            review_date: payload.review.read_at,
            review_text: payload.review.text,
            review_is_spoiler: payload.review.is_netabare,
            review_is_draft: payload.review.is_draft,
            bookcase_names: payload.bookcases,
        }
    }
}

/// Payload embedded in thumbnail listings (`.thumbnail__action > div`).
#[derive(Debug, Deserialize)]
pub(crate) struct ThumbnailPayload {
    book: ThumbnailPayloadBook,
}

#[derive(Debug, Deserialize)]
struct ThumbnailPayloadBook {
    id: u64,
    asin: String,
    title: String,
    author: Option<String>,
    image_url: String,
    page: u32,
}

impl From<ThumbnailPayload> for Book {
    fn from(payload: ThumbnailPayload) -> Self {
        let book = payload.book;
        Self {
            book_author: book.author,
            book_page: book.page,
            book_id: book.id,
            book_asin: book.asin,
            book_title: book.title,
            book_image_url: book.image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book(id: u64) -> Book {
        Book {
            book_author: Some("夏目漱石".to_string()),
            book_page: 320,
            book_id: id,
            book_asin: "4101010013".to_string(),
            book_title: "こころ".to_string(),
            book_image_url: "https://m.media-amazon.com/images/I/cover.jpg".to_string(),
        }
    }

    #[test]
    fn test_review_payload_mapping() {
        let json = r#"{
            "author": "夏目漱石",
            "pages": 320,
            "book": {"id": 548397, "asin": "4101010013", "title": "こころ", "image_url": "https://example.com/c.jpg", "extra": 1},
            "review": {"text": null, "is_netabare": false, "read_at": "2021/03/04", "is_draft": false},
            "bookcases": ["文学", "再読"]
        }"#;
        let payload: ReviewPayload = serde_json::from_str(json).unwrap();
        let reviewed = ReviewedBook::from(payload);

        assert_eq!(reviewed.book.book_id, 548397);
        assert_eq!(reviewed.book.book_page, 320);
        assert_eq!(reviewed.review_date, "2021/03/04");
        assert_eq!(reviewed.review_text, None);
        assert_eq!(reviewed.review_is_spoiler, Some(false));
        assert_eq!(reviewed.bookcase_names, vec!["文学", "再読"]);
    }

    #[test]
    fn test_thumbnail_payload_mapping() {
        let json = r#"{"book": {"id": 1, "asin": "B00ABC", "title": "T", "author": null, "image_url": "u", "page": 12}}"#;
        let payload: ThumbnailPayload = serde_json::from_str(json).unwrap();
        let book = Book::from(payload);
        assert_eq!(book.book_author, None);
        assert_eq!(book.book_page, 12);
        assert_eq!(book.book_asin, "B00ABC");
    }

    #[test]
    fn test_payload_missing_field_is_rejected() {
        let json = r#"{"book": {"id": 1, "title": "T", "author": null, "image_url": "u", "page": 12}}"#;
        let err = serde_json::from_str::<ThumbnailPayload>(json).unwrap_err();
        assert!(err.to_string().contains("asin"));
    }

    #[test]
    fn test_reviewed_book_serializes_flat_in_order() {
        let reviewed = ReviewedBook {
            book: sample_book(7),
            review_date: "2021-03-04".to_string(),
            review_text: None,
            review_is_spoiler: None,
            review_is_draft: true,
            bookcase_names: Vec::new(),
        };
        let value = serde_json::to_value(BookRecord::Reviewed(reviewed)).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "bookAuthor",
                "bookPage",
                "bookId",
                "bookAsin",
                "bookTitle",
                "bookImageUrl",
                "reviewDate",
                "reviewText",
                "reviewIsSpoiler",
                "reviewIsDraft",
                "bookcaseNames",
            ]
        );
        assert!(value["reviewText"].is_null());
    }
}
