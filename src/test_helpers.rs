//! Shared test utilities for the bookgen test suite.
//!
//! Provides fixture setup, small writers for building content trees inside a
//! `TempDir`, blank graph nodes for pure unit tests, and lookup helpers that
//! panic with the list of available ids on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let collection = scan(tmp.path(), &CommonMark::new()).unwrap();
//!
//! let book = find_book(&collection, "moonlight");
//! assert_eq!(chapter_titles(book), vec!["The Lamp", "Night Walk", "Morning"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::types::{Book, Chapter, Collection, Content, GenerateSettings, Params};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/collection/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/collection");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Content tree writers
// =========================================================================

/// Write `bookgen.yml` at the content root.
pub fn write_collection(root: &Path, yaml: &str) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("bookgen.yml"), yaml).unwrap();
}

/// Create `books/<id>/` with a `bookgen-book.yml`. Returns the book dir.
pub fn write_book(root: &Path, id: &str, yaml: &str) -> PathBuf {
    let dir = root.join("books").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("bookgen-book.yml"), yaml).unwrap();
    dir
}

/// Write `books/<book>/chapters/<id>.md`.
pub fn write_chapter(root: &Path, book: &str, id: &str, markdown: &str) {
    let dir = root.join("books").join(book).join("chapters");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{id}.md")), markdown).unwrap();
}

// =========================================================================
// Blank nodes for pure tests
// =========================================================================

pub fn blank_collection() -> Collection {
    Collection {
        title: String::new(),
        description: String::new(),
        base_url: String::new(),
        language_code: String::new(),
        favicon: None,
        copyright: String::new(),
        generate: GenerateSettings::default(),
        params: Params::new(),
        build_time: chrono::DateTime::<chrono::Utc>::default(),
        books: Vec::new(),
        source_dir: PathBuf::new(),
    }
}

pub fn blank_book() -> Book {
    Book {
        id: String::new(),
        title: String::new(),
        subtitle: String::new(),
        title_sort: String::new(),
        description: String::new(),
        authors: Vec::new(),
        series: None,
        status: None,
        cover: None,
        favicon: None,
        language_code: String::new(),
        copyright: String::new(),
        identifiers: Vec::new(),
        tags: Vec::new(),
        published: None,
        published_end: None,
        modified: None,
        blurb: Content::default(),
        generate: GenerateSettings::default(),
        url: String::new(),
        params: Params::new(),
        index: 0,
        chapters: Vec::new(),
        source_dir: PathBuf::new(),
    }
}

/// A chapter whose title equals its id.
pub fn blank_chapter(id: &str) -> Chapter {
    Chapter {
        id: id.to_string(),
        title: id.to_string(),
        subtitle: String::new(),
        description: String::new(),
        order: 0,
        authors: Vec::new(),
        language_code: String::new(),
        copyright: String::new(),
        published: None,
        modified: None,
        content: Content::default(),
        reading_minutes: 1,
        previous: None,
        next: None,
        book: 0,
        params: Params::new(),
        source_path: PathBuf::new(),
    }
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a book by id. Panics if not found.
pub fn find_book<'a>(collection: &'a Collection, id: &str) -> &'a Book {
    collection
        .books
        .iter()
        .find(|b| b.id == id)
        .unwrap_or_else(|| panic!("book '{id}' not found. Available: {:?}", book_ids(collection)))
}

/// Find a chapter by id within a book. Panics if not found.
pub fn find_chapter<'a>(book: &'a Book, id: &str) -> &'a Chapter {
    book.chapters.iter().find(|c| c.id == id).unwrap_or_else(|| {
        panic!(
            "chapter '{id}' not found in book '{}'. Available: {:?}",
            book.id,
            chapter_ids(book)
        )
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All book ids in collection order.
pub fn book_ids(collection: &Collection) -> Vec<&str> {
    collection.books.iter().map(|b| b.id.as_str()).collect()
}

/// All chapter ids in sorted order.
pub fn chapter_ids(book: &Book) -> Vec<&str> {
    book.chapters.iter().map(|c| c.id.as_str()).collect()
}

/// All chapter titles in sorted order.
pub fn chapter_titles(book: &Book) -> Vec<&str> {
    book.chapters.iter().map(|c| c.title.as_str()).collect()
}
