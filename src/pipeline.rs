//! Stage orchestration: decode → validate → render.
//!
//! [`check`] stops after validation and writes nothing. [`build`] also
//! renders, after making sure the output directory cannot swallow any
//! source: the renderer deletes the output directory before writing.

use crate::decode::DecodeError;
use crate::markdown::CommonMark;
use crate::render::{self, RenderError, RenderOptions, RenderReport};
use crate::scan::{self, BOOKS_DIR};
use crate::types::Collection;
use crate::validate::{self, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default output directory, relative to the input directory.
pub const DEFAULT_OUTPUT_DIR: &str = "out";
/// Default layout directory, relative to the input directory.
pub const DEFAULT_LAYOUTS_DIR: &str = "layouts";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(
        "output directory `{}` overlaps source directory `{}`",
        output.display(),
        input.display()
    )]
    OutputOverlapsInput { output: PathBuf, input: PathBuf },
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input_dir: PathBuf,
    /// Defaults to `<input>/out`.
    pub output_dir: Option<PathBuf>,
    /// Defaults to `<input>/layouts`.
    pub layouts_dir: Option<PathBuf>,
    pub minify: bool,
}

impl BuildOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            layouts_dir: None,
            minify: false,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join(DEFAULT_OUTPUT_DIR))
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.layouts_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join(DEFAULT_LAYOUTS_DIR))
    }
}

/// What a successful build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub collection: Collection,
    pub output_dir: PathBuf,
    pub render: RenderReport,
}

/// Decode and validate the collection at `input_dir`.
pub fn check(input_dir: &Path) -> Result<Collection, BuildError> {
    info!(input = %input_dir.display(), "decoding collection");
    let collection = scan::scan(input_dir, &CommonMark::new())?;
    validate::validate(&collection)?;
    info!(books = collection.books.len(), "collection is valid");
    Ok(collection)
}

/// Decode, validate and render.
pub fn build(options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let output_dir = options.output_dir();
    ensure_disjoint(options, &output_dir)?;

    let collection = check(&options.input_dir)?;

    info!(output = %output_dir.display(), "rendering");
    let render = render::render(
        &collection,
        &RenderOptions {
            output_dir: output_dir.clone(),
            layouts_dir: options.layouts_dir(),
            minify: options.minify,
        },
    )?;

    Ok(BuildReport {
        collection,
        output_dir,
        render,
    })
}

/// The output directory is wiped on every build. It may sit inside the
/// input directory (the default `out/` does) but must not be, contain, or
/// sit inside the input, its `books/` tree or the layout directory.
fn ensure_disjoint(options: &BuildOptions, output: &Path) -> Result<(), BuildError> {
    let output_abs = resolve(output);
    let input_abs = resolve(&options.input_dir);
    let overlaps = |dir: &Path| dir.starts_with(&output_abs);
    let encloses = |dir: &Path| output_abs.starts_with(dir);

    let books = options.input_dir.join(BOOKS_DIR);
    let layouts = options.layouts_dir();
    let conflict = if overlaps(&input_abs) {
        Some(options.input_dir.clone())
    } else {
        [books, layouts].into_iter().find(|dir| {
            let abs = resolve(dir);
            overlaps(&abs) || encloses(&abs)
        })
    };

    match conflict {
        Some(dir) => Err(BuildError::OutputOverlapsInput {
            output: output.to_path_buf(),
            input: dir,
        }),
        None => Ok(()),
    }
}

/// Absolute form of `path`. A path that does not exist yet is resolved
/// through its nearest existing ancestor so symlinks compare equal.
fn resolve(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut missing = Vec::new();
    let mut base = abs.as_path();
    loop {
        if let Ok(real) = fs::canonicalize(base) {
            return missing.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (base.parent(), base.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                base = parent;
            }
            _ => return abs,
        }
    }
}
