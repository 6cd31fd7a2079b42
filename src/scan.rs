//! Content tree builder.
//!
//! Walks a content root and builds the [`Collection`] → [`Book`] →
//! [`Chapter`] graph. Chapters are handed to [`crate::decode`] (parallel per
//! book) and then sorted and linked by [`crate::order`].
//!
//! ## Directory Structure
//!
//! ```text
//! my-writing/                      # Content root
//! ├── bookgen.yml                  # Collection config (required)
//! ├── favicon.png                  # Optional, named by `favicon`
//! ├── layouts/                     # Template overrides + static assets
//! └── books/
//!     ├── moonlight/               # Book id = directory name
//!     │   ├── bookgen-book.yml     # Book config (required)
//!     │   ├── index.md             # Blurb (optional)
//!     │   ├── cover.jpg            # Optional, named by `cover`
//!     │   └── chapters/
//!     │       ├── arrival.md       # Chapter id = file stem
//!     │       └── departure.md
//!     └── .drafts/                 # Hidden directories are skipped
//! ```
//!
//! ## Error Policy
//!
//! Fail fast. A missing or malformed book config, an unreadable chapter or a
//! bad date aborts the whole collection; no partially decoded collection is
//! ever returned.

use crate::config::{
    self, BOOK_CONFIG_STEM, BookConfig, COLLECTION_CONFIG_STEM, CollectionConfig, Projected,
};
use crate::dates::DateInput;
use crate::decode::{self, DecodeError};
use crate::markdown::MarkdownConverter;
use crate::order;
use crate::types::{Book, Collection, Content};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the directory holding one subdirectory per book.
pub const BOOKS_DIR: &str = "books";
/// Book blurb file, relative to the book directory.
pub const BLURB_FILE: &str = "index.md";

/// Decode the whole content tree rooted at `root`.
pub fn scan(root: &Path, converter: &dyn MarkdownConverter) -> Result<Collection, DecodeError> {
    let build_time = Utc::now();
    let (config_path, projected) = config::load_node_config::<CollectionConfig>(
        root,
        COLLECTION_CONFIG_STEM,
        config::collection_defaults(),
    )?;
    info!(config = %config_path.display(), "loaded collection config");

    let mut collection = new_collection(root, projected, build_time);

    let book_dirs = list_book_dirs(&root.join(BOOKS_DIR))?;
    for (index, dir) in book_dirs.iter().enumerate() {
        let book = scan_book(dir, index, &collection, converter).map_err(|source| {
            DecodeError::Book {
                id: dir_name(dir),
                source: Box::new(source),
            }
        })?;
        debug!(book = %book.id, chapters = book.chapters.len(), "decoded book");
        collection.books.push(book);
    }

    info!(
        books = collection.books.len(),
        chapters = collection.books.iter().map(|b| b.chapters.len()).sum::<usize>(),
        "decoded collection"
    );
    Ok(collection)
}

fn new_collection(
    root: &Path,
    projected: Projected<CollectionConfig>,
    build_time: DateTime<Utc>,
) -> Collection {
    let Projected { fields, params } = projected;
    Collection {
        title: fields.title,
        description: fields.description,
        base_url: fields.base_url,
        language_code: fields.language_code,
        favicon: fields.favicon,
        copyright: fields.copyright,
        generate: fields.generate,
        params,
        build_time,
        books: Vec::new(),
        source_dir: root.to_path_buf(),
    }
}

/// Decode one book directory, including all of its chapters.
///
/// `collection` supplies the inherited defaults; its `books` vector is not
/// read.
pub fn scan_book(
    dir: &Path,
    index: usize,
    collection: &Collection,
    converter: &dyn MarkdownConverter,
) -> Result<Book, DecodeError> {
    let name = dir_name(dir);
    let defaults = config::book_defaults(&collection.language_code, collection.generate);
    let (_, Projected { fields, params }) =
        config::load_node_config::<BookConfig>(dir, BOOK_CONFIG_STEM, defaults)?;

    let blurb = read_blurb(dir, converter)?;
    let url = join_url(&collection.base_url, &format!("{BOOKS_DIR}/{name}"));

    let mut book = Book {
        id: fields.id.unwrap_or_else(|| name.clone()),
        title: fields.title,
        subtitle: fields.subtitle,
        title_sort: fields.title_sort,
        description: fields.description,
        authors: fields.authors,
        series: fields.series,
        status: fields.status,
        cover: fields.cover,
        favicon: fields.favicon,
        language_code: fields.language_code,
        copyright: fields.copyright,
        identifiers: fields.identifiers,
        tags: fields.tags,
        published: resolve_date("published", fields.published.as_ref())?,
        published_end: resolve_date("published_end", fields.published_end.as_ref())?,
        modified: resolve_date("modified", fields.modified.as_ref())?,
        blurb,
        generate: fields.generate,
        url,
        params,
        index,
        chapters: Vec::new(),
        source_dir: dir.to_path_buf(),
    };

    book.chapters = decode::decode_chapters(&dir.join(decode::CHAPTERS_DIR), &book, converter)?;
    order::sort_and_link(&mut book.chapters);
    order::derive_book_dates(&mut book);
    Ok(book)
}

/// Resolve an optional date field through the format cascade.
pub(crate) fn resolve_date(
    field: &'static str,
    input: Option<&DateInput>,
) -> Result<Option<DateTime<FixedOffset>>, DecodeError> {
    input
        .map(|value| {
            value
                .resolve()
                .map_err(|source| DecodeError::Date { field, source })
        })
        .transpose()
}

fn read_blurb(dir: &Path, converter: &dyn MarkdownConverter) -> Result<Content, DecodeError> {
    let path = dir.join(BLURB_FILE);
    if !path.is_file() {
        warn!(path = %path.display(), "book has no blurb file");
        return Ok(Content::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| DecodeError::Io {
        path: path.clone(),
        source,
    })?;
    let converted = converter
        .convert(&raw)
        .map_err(|source| DecodeError::Markdown { path, source })?;
    Ok(Content {
        raw,
        html: converted.html,
        xhtml: converted.xhtml,
    })
}

/// Book candidates: visible subdirectories of `books/`, by name.
///
/// A missing `books/` directory means an empty collection.
fn list_book_dirs(books_dir: &Path) -> Result<Vec<PathBuf>, DecodeError> {
    if !books_dir.is_dir() {
        warn!(path = %books_dir.display(), "no books directory");
        return Ok(Vec::new());
    }
    let io_err = |source| DecodeError::Io {
        path: books_dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(books_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

pub(crate) fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        return format!("/{path}");
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}
