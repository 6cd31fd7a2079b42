//! Chapter decoding.
//!
//! Each `.md` file under a book's `chapters/` directory becomes one
//! [`Chapter`]. Files are independent, so a book's chapters are decoded on
//! the rayon pool: the directory listing fixes one result slot per file and
//! every worker writes only its own slot. The slots are read after the
//! parallel loop has joined, so decode completion order never leaks into
//! the result. The only meaningful order is the one [`crate::order`]
//! imposes afterwards.
//!
//! The first failing worker stops the fan-out; workers already running
//! finish and their chapters are dropped with the rest of the slots.

use crate::config::{self, ChapterFrontMatter, ConfigError, Projected};
use crate::dates::DateError;
use crate::markdown::{MarkdownConverter, MarkdownError};
use crate::scan::{dir_name, is_hidden, resolve_date};
use crate::types::{Book, Chapter, Content};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Chapter directory, relative to the book directory.
pub const CHAPTERS_DIR: &str = "chapters";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to convert `{}`: {source}", path.display())]
    Markdown {
        path: PathBuf,
        #[source]
        source: MarkdownError,
    },
    #[error("invalid front matter in `{}`: {source}", path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse `{field}`: {source}")]
    Date {
        field: &'static str,
        #[source]
        source: DateError,
    },
    #[error("book `{id}`: {source}")]
    Book {
        id: String,
        #[source]
        source: Box<DecodeError>,
    },
    #[error("chapter `{id}`: {source}")]
    Chapter {
        id: String,
        #[source]
        source: Box<DecodeError>,
    },
}

/// Decode every chapter file in `dir` for `book`.
///
/// The returned vector is in directory-listing order and unlinked; callers
/// sort and link it. A missing directory yields no chapters.
pub fn decode_chapters(
    dir: &Path,
    book: &Book,
    converter: &dyn MarkdownConverter,
) -> Result<Vec<Chapter>, DecodeError> {
    let paths = list_chapter_files(dir)?;
    let mut slots: Vec<Option<Chapter>> = (0..paths.len()).map(|_| None).collect();

    slots
        .par_iter_mut()
        .zip(paths.par_iter())
        .try_for_each(|(slot, path)| -> Result<(), DecodeError> {
            let chapter = decode_chapter(path, book, converter).map_err(|source| {
                DecodeError::Chapter {
                    id: chapter_id(path),
                    source: Box::new(source),
                }
            })?;
            trace!(chapter = %chapter.id, "decoded chapter");
            *slot = Some(chapter);
            Ok(())
        })?;

    debug!(book = %book.id, count = slots.len(), "decoded chapters");
    Ok(slots.into_iter().flatten().collect())
}

/// Decode a single chapter file.
pub fn decode_chapter(
    path: &Path,
    book: &Book,
    converter: &dyn MarkdownConverter,
) -> Result<Chapter, DecodeError> {
    let id = chapter_id(path);
    let raw = fs::read_to_string(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let converted = converter
        .convert(&raw)
        .map_err(|source| DecodeError::Markdown {
            path: path.to_path_buf(),
            source,
        })?;
    let reading_minutes = converted.reading_minutes();

    let defaults = config::chapter_defaults(&book.language_code, &book.authors, &book.copyright);
    let Projected { fields, params } =
        config::project::<ChapterFrontMatter>(converted.front_matter, defaults).map_err(
            |source| DecodeError::FrontMatter {
                path: path.to_path_buf(),
                source,
            },
        )?;

    Ok(Chapter {
        title: fields.title.unwrap_or_else(|| id.clone()),
        id,
        subtitle: fields.subtitle,
        description: fields.description,
        order: fields.order,
        authors: fields.authors,
        language_code: fields.language_code,
        copyright: fields.copyright,
        published: resolve_date("published", fields.published.as_ref())?,
        modified: resolve_date("modified", fields.modified.as_ref())?,
        content: Content {
            raw,
            html: converted.html,
            xhtml: converted.xhtml,
        },
        reading_minutes,
        previous: None,
        next: None,
        book: book.index,
        params,
        source_path: path.to_path_buf(),
    })
}

/// Regular, visible files with a `.md` extension (any case), by name.
fn list_chapter_files(dir: &Path) -> Result<Vec<PathBuf>, DecodeError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let io_err = |source| DecodeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && !is_hidden(&path) && is_markdown(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn chapter_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir_name(path))
}
