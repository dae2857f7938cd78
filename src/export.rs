//! JSON and CSV export.
//!
//! Every collection lands as a `<basename>.json` / `<basename>.csv` pair in
//! the output directory. CSV columns follow the keys of the first record.

use crate::error::ExportError;
use crate::records::Profile;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Basename of the profile export files.
pub const PROFILE_BASENAME: &str = "profile";

/// Paths written by one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub rows: usize,
}

/// Writes export files into one directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Writes a collection of uniformly shaped records.
    ///
    /// An empty collection yields `[]` and an empty CSV file, since no header
    /// can be derived without a first record.
    pub fn write_collection<T: Serialize>(
        &self,
        basename: &str,
        records: &[T],
    ) -> Result<ExportedFiles, ExportError> {
        self.ensure_dir()?;

        let json = self.dir.join(format!("{}.json", basename));
        std::fs::write(&json, serde_json::to_string_pretty(records)?)?;

        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let csv = self.dir.join(format!("{}.csv", basename));
        write_csv(&csv, &rows)?;

        Ok(ExportedFiles {
            json,
            csv,
            rows: records.len(),
        })
    }

    /// Writes the single profile record.
    pub fn write_profile(&self, profile: &Profile) -> Result<ExportedFiles, ExportError> {
        self.ensure_dir()?;

        let json = self.dir.join(format!("{}.json", PROFILE_BASENAME));
        std::fs::write(&json, serde_json::to_string_pretty(profile)?)?;

        let csv = self.dir.join(format!("{}.csv", PROFILE_BASENAME));
        write_csv(&csv, &[serde_json::to_value(profile)?])?;

        Ok(ExportedFiles { json, csv, rows: 1 })
    }
}

fn write_csv(path: &Path, rows: &[Value]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;

    let Some(first) = rows.first() else {
        writer.flush()?;
        return Ok(());
    };

    let columns: Vec<String> = first
        .as_object()
        .ok_or(ExportError::NotAnObject(0))?
        .keys()
        .cloned()
        .collect();
    writer.write_record(&columns)?;

    for (index, row) in rows.iter().enumerate() {
        let object = row.as_object().ok_or(ExportError::NotAnObject(index))?;
        let cells = columns
            .iter()
            .map(|column| object.get(column).map(csv_cell).unwrap_or_default());
        writer.write_record(cells)?;
    }

    writer.flush()?;
    Ok(())
}

/// Renders one JSON value as a CSV cell.
///
/// `null` and `false` become empty cells and `true` becomes `1`; nested
/// arrays and objects are written as compact JSON.
fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Book, BookRecord, ReviewedBook};
    use tempfile::TempDir;

    fn book(id: u64, title: &str) -> Book {
        Book {
            book_author: Some("宮沢賢治".to_string()),
            book_page: 150,
            book_id: id,
            book_asin: format!("41010{:05}", id),
            book_title: title.to_string(),
            book_image_url: format!("https://img.example.com/{}.jpg", id),
        }
    }

    fn reviewed(id: u64, text: Option<&str>) -> ReviewedBook {
        ReviewedBook {
            book: book(id, "銀河鉄道の夜"),
            review_date: "2022/08/01".to_string(),
            review_text: text.map(str::to_string),
            review_is_spoiler: Some(false),
            review_is_draft: false,
            bookcase_names: vec!["童話".to_string(), "再読".to_string()],
        }
    }

    fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("export").join("nested"));

        exporter.ensure_dir().unwrap();
        exporter.ensure_dir().unwrap();
        assert!(exporter.dir().is_dir());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let records = vec![reviewed(1, Some("よかった")), reviewed(2, None)];
        let wrapped: Vec<BookRecord> = records.iter().cloned().map(BookRecord::Reviewed).collect();

        let files = exporter.write_collection("finished-books", &wrapped).unwrap();

        let content = std::fs::read_to_string(&files.json).unwrap();
        assert!(content.starts_with("[\n  {\n    \"bookAuthor\""));
        let parsed: Vec<ReviewedBook> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_csv_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let records = vec![book(1, "a"), book(2, "b, with comma"), book(3, "c")];

        let files = exporter.write_collection("wish-list-books", &records).unwrap();
        assert_eq!(files.rows, 3);

        let (headers, rows) = read_csv(&files.csv);
        assert_eq!(
            headers,
            ["bookAuthor", "bookPage", "bookId", "bookAsin", "bookTitle", "bookImageUrl"]
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][4], "b, with comma");
        assert_eq!(rows[2][2], "3");
    }

    #[test]
    fn test_absent_review_text_is_null_and_empty() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let records = vec![BookRecord::Reviewed(reviewed(9, None))];

        let files = exporter.write_collection("finished-books", &records).unwrap();

        let json: Value = serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert!(json[0]["reviewText"].is_null());

        let (headers, rows) = read_csv(&files.csv);
        let column = headers.iter().position(|h| h == "reviewText").unwrap();
        assert_eq!(rows[0][column], "");

        let bookcases = headers.iter().position(|h| h == "bookcaseNames").unwrap();
        assert_eq!(rows[0][bookcases], r#"["童話","再読"]"#);
    }

    #[test]
    fn test_empty_collection() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());

        let files = exporter.write_collection::<Book>("reading-books", &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&files.json).unwrap(), "[]");
        assert_eq!(std::fs::read_to_string(&files.csv).unwrap(), "");
        assert_eq!(files.rows, 0);
    }

    #[test]
    fn test_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        std::fs::write(dir.path().join("reading-books.json"), "stale").unwrap();

        let files = exporter.write_collection("reading-books", &[book(1, "a")]).unwrap();
        let parsed: Vec<Book> = serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_profile_export() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let profile = Profile {
            id: "104729".to_string(),
            name: "読書太郎".to_string(),
            icon_url: "https://img.example.com/icon.png".to_string(),
            registration_date: "2015-04-01".to_string(),
            first_recording_date: "2015-04-02".to_string(),
        };

        let files = exporter.write_profile(&profile).unwrap();

        let parsed: Profile = serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(parsed, profile);

        let (headers, rows) = read_csv(&files.csv);
        assert_eq!(
            headers,
            ["id", "name", "iconUrl", "registrationDate", "firstRecordingDate"]
        );
        assert_eq!(rows, vec![vec!["104729", "読書太郎", "https://img.example.com/icon.png", "2015-04-01", "2015-04-02"]]);
    }

    #[test]
    fn test_csv_cell_encoding() {
        assert_eq!(csv_cell(&Value::Null), "");
        assert_eq!(csv_cell(&Value::Bool(true)), "1");
        assert_eq!(csv_cell(&Value::Bool(false)), "");
        assert_eq!(csv_cell(&serde_json::json!(42)), "42");
        assert_eq!(csv_cell(&serde_json::json!("x")), "x");
    }
}
