//! The four book listings kept per account.

use std::fmt;

use clap::ValueEnum;

/// Shape of the records a shelf listing embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Book metadata only.
    Plain,
    /// Book metadata plus the reader's review and bookcases.
    Reviewed,
}

/// A shelf listing on the user's page.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shelf {
    /// Books marked as finished (読んだ本).
    Read,
    /// Books currently being read (読んでる本).
    Reading,
    /// Books stacked to read later (積読本).
    Stacked,
    /// Books on the wish list (読みたい本).
    Wish,
}

impl Shelf {
    /// All shelves in export order.
    pub const ALL: [Shelf; 4] = [Shelf::Read, Shelf::Reading, Shelf::Stacked, Shelf::Wish];

    /// Path of the listing relative to the user's page, including query.
    ///
    /// The finished listing is requested in its list layout because only that
    /// layout embeds review payloads.
    pub fn path(self) -> &'static str {
        match self {
            Shelf::Read => "books/read?display_type=list",
            Shelf::Reading => "books/reading",
            Shelf::Stacked => "books/stacked",
            Shelf::Wish => "books/wish",
        }
    }

    /// Basename of the exported `.json` / `.csv` pair.
    pub fn export_basename(self) -> &'static str {
        match self {
            Shelf::Read => "finished-books",
            Shelf::Reading => "reading-books",
            Shelf::Stacked => "reading-list-books",
            Shelf::Wish => "wish-list-books",
        }
    }

    pub fn shape(self) -> RecordShape {
        match self {
            Shelf::Read => RecordShape::Reviewed,
            Shelf::Reading | Shelf::Stacked | Shelf::Wish => RecordShape::Plain,
        }
    }
}

impl fmt::Display for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shelf::Read => "read",
            Shelf::Reading => "reading",
            Shelf::Stacked => "stacked",
            Shelf::Wish => "wish",
        };
        f.write_str(name)
    }
}
