//! Structural validation of a decoded collection.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. collection `title` is not blank
//! 2. collection `language_code` is not blank
//! 3. for each book, in collection order:
//!    - `id` equals the book directory name
//!    - `title` is not blank
//!    - `language_code` is not blank
//!    - `status`, when set, is a known [`BookStatus`]
//! 4. referenced images exist: the collection favicon (relative to the
//!    content root), then each book's cover and favicon (relative to the
//!    book directory)
//!
//! Chapters are not validated: their ids come from file names and are unique
//! by construction, and duplicate titles are allowed.

use crate::scan::dir_name;
use crate::types::{BookStatus, Collection};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("{node}: missing/empty required field `{field}`")]
    EmptyField { node: String, field: &'static str },
    #[error("book `{id}`: field `id` must equal the directory name `{dir}`")]
    IdMismatch { id: String, dir: String },
    #[error(
        "book `{id}`: invalid value {value:?} for field `status`, must be one of (case-insensitive): {}",
        BookStatus::valid_values()
    )]
    InvalidStatus { id: String, value: String },
    #[error("{node}: `{field}` image not found at `{}`", path.display())]
    MissingAsset {
        node: String,
        field: &'static str,
        path: PathBuf,
    },
}

/// Validate the collection and all of its books.
pub fn validate(collection: &Collection) -> Result<(), ValidationError> {
    let root = format!("collection `{}`", collection.source_dir.display());

    require(&root, "title", &collection.title)?;
    require(&root, "language_code", &collection.language_code)?;

    for book in &collection.books {
        let dir = dir_name(&book.source_dir);
        if book.id != dir {
            return Err(ValidationError::IdMismatch {
                id: book.id.clone(),
                dir,
            });
        }
        let node = format!("book `{}`", book.id);
        require(&node, "title", &book.title)?;
        require(&node, "language_code", &book.language_code)?;
        if let Some(status) = book.status.as_deref().filter(|s| !s.trim().is_empty()) {
            if status.parse::<BookStatus>().is_err() {
                return Err(ValidationError::InvalidStatus {
                    id: book.id.clone(),
                    value: status.to_string(),
                });
            }
        }
    }

    require_asset(&root, "favicon", &collection.source_dir, collection.favicon.as_deref())?;
    for book in &collection.books {
        let node = format!("book `{}`", book.id);
        require_asset(&node, "cover", &book.source_dir, book.cover.as_deref())?;
        require_asset(&node, "favicon", &book.source_dir, book.favicon.as_deref())?;
    }

    Ok(())
}

fn require(node: &str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            node: node.to_string(),
            field,
        });
    }
    Ok(())
}

fn require_asset(
    node: &str,
    field: &'static str,
    base: &Path,
    name: Option<&str>,
) -> Result<(), ValidationError> {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return Ok(());
    };
    let path = base.join(name);
    if !path.is_file() {
        return Err(ValidationError::MissingAsset {
            node: node.to_string(),
            field,
            path,
        });
    }
    Ok(())
}
