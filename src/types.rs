//! The decoded document graph: collection → books → chapters.
//!
//! The graph is an arena. A [`Collection`] owns its books, a [`Book`] owns
//! its chapters, and every cross-reference (parent book, previous chapter,
//! next chapter) is an index into the owning vector. Nothing here holds a
//! reference, so the whole graph is `Send + Sync` and can be borrowed by
//! any number of render workers at once.
//!
//! All types serialize with serde; the renderer hands them (wrapped in the
//! page contexts from [`crate::templates`]) straight to the template engine.
//! Fields that only make sense on disk (`source_dir`, `source_path`) and the
//! child vectors are skipped, the page contexts expose children explicitly.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration keys that did not map onto a typed field, with their
/// original spelling.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Root of the hierarchy. One per build invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub language_code: String,
    pub favicon: Option<String>,
    pub copyright: String,
    pub generate: GenerateSettings,
    pub params: Params,
    /// Captured once when the collection is created. Not used by the
    /// built-in templates so repeated builds stay byte-identical.
    pub build_time: DateTime<Utc>,
    #[serde(skip)]
    pub books: Vec<Book>,
    #[serde(skip)]
    pub source_dir: PathBuf,
}

/// An ordered work made of chapters, decoded from `books/<id>/`.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub title_sort: String,
    pub description: String,
    pub authors: Vec<Author>,
    pub series: Option<Series>,
    pub status: Option<String>,
    pub cover: Option<String>,
    pub favicon: Option<String>,
    pub language_code: String,
    pub copyright: String,
    pub identifiers: Vec<String>,
    pub tags: Vec<String>,
    pub published: Option<DateTime<FixedOffset>>,
    pub published_end: Option<DateTime<FixedOffset>>,
    pub modified: Option<DateTime<FixedOffset>>,
    pub blurb: Content,
    pub generate: GenerateSettings,
    /// Absolute URL of the book's index page directory.
    pub url: String,
    pub params: Params,
    /// Position within [`Collection::books`].
    #[serde(skip)]
    pub index: usize,
    #[serde(skip)]
    pub chapters: Vec<Chapter>,
    #[serde(skip)]
    pub source_dir: PathBuf,
}

/// A single page of content, decoded from `chapters/<id>.md`.
#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    /// User-assigned primary sort key.
    pub order: i64,
    pub authors: Vec<Author>,
    pub language_code: String,
    pub copyright: String,
    pub published: Option<DateTime<FixedOffset>>,
    pub modified: Option<DateTime<FixedOffset>>,
    pub content: Content,
    /// Estimated minutes to read the body, never below one.
    pub reading_minutes: usize,
    /// Index of the preceding chapter in the book's sorted sequence.
    pub previous: Option<usize>,
    /// Index of the following chapter in the book's sorted sequence.
    pub next: Option<usize>,
    /// Index of the owning book within the collection.
    pub book: usize,
    pub params: Params,
    #[serde(skip)]
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub name: String,
    pub about: String,
    pub links: Vec<ExternalLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLink {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Series {
    pub name: String,
    pub number: f32,
}

/// Markdown source next to its rendered HTML.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Content {
    pub raw: String,
    pub html: String,
    /// Well-formed rendition for EPUB sections; raw HTML is left out.
    pub xhtml: String,
}

/// Which per-book artifacts the renderer emits besides HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    pub epub: bool,
    pub rss: bool,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            epub: true,
            rss: true,
        }
    }
}

/// Publication state of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStatus {
    Completed,
    Hiatus,
    Inactive,
    Ongoing,
}

impl BookStatus {
    pub const ALL: [BookStatus; 4] = [
        BookStatus::Completed,
        BookStatus::Hiatus,
        BookStatus::Inactive,
        BookStatus::Ongoing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookStatus::Completed => "completed",
            BookStatus::Hiatus => "hiatus",
            BookStatus::Inactive => "inactive",
            BookStatus::Ongoing => "ongoing",
        }
    }

    /// The valid values joined for error messages: `completed | hiatus | ...`.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Whether the book has stopped receiving chapters.
    pub fn is_finished(self) -> bool {
        matches!(self, BookStatus::Completed | BookStatus::Inactive)
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = ();

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

impl Book {
    /// The parsed status, if one is set and valid.
    pub fn parsed_status(&self) -> Option<BookStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Ongoing".parse::<BookStatus>(), Ok(BookStatus::Ongoing));
        assert_eq!(" HIATUS ".parse::<BookStatus>(), Ok(BookStatus::Hiatus));
        assert_eq!("archived".parse::<BookStatus>(), Err(()));
    }

    #[test]
    fn valid_values_lists_every_status() {
        assert_eq!(
            BookStatus::valid_values(),
            "completed | hiatus | inactive | ongoing"
        );
    }

    #[test]
    fn finished_statuses() {
        assert!(BookStatus::Completed.is_finished());
        assert!(BookStatus::Inactive.is_finished());
        assert!(!BookStatus::Ongoing.is_finished());
        assert!(!BookStatus::Hiatus.is_finished());
    }

    #[test]
    fn generate_settings_default_on() {
        let settings = GenerateSettings::default();
        assert!(settings.epub);
        assert!(settings.rss);
    }
}
