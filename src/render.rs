//! Output stage: decoded collection in, site on disk out.
//!
//! A build moves through four steps:
//!
//! ```text
//! init               remove and recreate the output directory
//! collection-render  index.html, collection favicon, layout static assets
//! book-render × N    one rayon task per book
//! done               RenderReport
//! ```
//!
//! Inside a book task the index page (plus cover and favicon copies) and the
//! chapter pages render side by side via `rayon::join`; chapters fan out
//! again with `par_iter`. When both halves have joined the feed and EPUB are
//! written. Every output file is written by exactly one task.
//!
//! All books run to completion even if one fails. The first failure, in
//! book order, is returned once every task has joined. Files already written
//! stay on disk.

use crate::epub::{self, EpubBuilder, EpubError, escape_xml};
use crate::feed;
use crate::minify::{self, MinifyError, Minifier};
use crate::templates::context::{book_asset_path, chapter_path, epub_path, rss_path};
use crate::templates::{
    BookPage, BookView, ChapterPage, CollectionPage, Role, TemplateError, Templates,
    is_template_file,
};
use crate::types::{Book, Collection};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to write `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to minify `{}`: {source}", path.display())]
    Minify {
        path: PathBuf,
        #[source]
        source: MinifyError,
    },
    #[error("failed to build `{}`: {source}", path.display())]
    Epub {
        path: PathBuf,
        #[source]
        source: EpubError,
    },
    #[error("failed to walk layouts: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("book `{id}`: {source}")]
    Book {
        id: String,
        #[source]
        source: Box<RenderError>,
    },
    #[error("chapter `{id}`: {source}")]
    Chapter {
        id: String,
        #[source]
        source: Box<RenderError>,
    },
}

/// Where and how to render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    /// Template overrides and static assets. Need not exist.
    pub layouts_dir: PathBuf,
    pub minify: bool,
}

/// Counts of what a render wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub books: usize,
    pub chapters: usize,
    pub feeds: usize,
    pub epubs: usize,
    /// Static files copied from the layout directory, layout-relative.
    pub assets: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct BookOutcome {
    chapters: usize,
    feed: bool,
    epub: bool,
}

/// Render `collection` into `options.output_dir`.
pub fn render(collection: &Collection, options: &RenderOptions) -> Result<RenderReport, RenderError> {
    let templates = Templates::load(&options.layouts_dir)?;
    for role in Role::ALL {
        if templates.is_overridden(role) {
            info!(template = role.file_name(), "using layout override");
        }
    }
    let minifier = options.minify.then(Minifier::new);
    let renderer = Renderer {
        collection,
        templates: &templates,
        minifier: minifier.as_ref(),
        output_dir: &options.output_dir,
    };

    init_output_dir(&options.output_dir)?;

    renderer.render_collection()?;
    let assets = renderer.copy_static_assets(&options.layouts_dir)?;

    let results: Vec<Result<BookOutcome, RenderError>> = collection
        .books
        .par_iter()
        .map(|book| {
            renderer.render_book(book).map_err(|source| RenderError::Book {
                id: book.id.clone(),
                source: Box::new(source),
            })
        })
        .collect();

    let mut report = RenderReport {
        assets,
        ..RenderReport::default()
    };
    for result in results {
        let outcome = result?;
        report.books += 1;
        report.chapters += outcome.chapters;
        report.feeds += usize::from(outcome.feed);
        report.epubs += usize::from(outcome.epub);
    }
    info!(
        books = report.books,
        chapters = report.chapters,
        assets = report.assets.len(),
        "rendered site"
    );
    Ok(report)
}

/// Remove `dir` if present, then create it empty.
fn init_output_dir(dir: &Path) -> Result<(), RenderError> {
    if dir.exists() {
        debug!(dir = %dir.display(), "removing previous output");
        fs::remove_dir_all(dir).map_err(|source| io_error(dir, source))?;
    }
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))
}

struct Renderer<'a> {
    collection: &'a Collection,
    templates: &'a Templates,
    minifier: Option<&'a Minifier>,
    output_dir: &'a Path,
}

impl Renderer<'_> {
    fn render_collection(&self) -> Result<(), RenderError> {
        let page = CollectionPage::new(self.collection);
        let html = self.templates.render_collection(&page)?;
        self.write_page("index.html", html)?;

        if let Some(favicon) = &self.collection.favicon {
            self.copy_file(
                &self.collection.source_dir.join(favicon),
                &self.output_dir.join(favicon.trim_start_matches('/')),
            )?;
        }
        Ok(())
    }

    /// Copy every non-template file under `layouts_dir`, keeping its
    /// relative path. Returns the copied paths in walk order.
    fn copy_static_assets(&self, layouts_dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        if !layouts_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut copied = Vec::new();
        for entry in WalkDir::new(layouts_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(layouts_dir) else {
                continue;
            };
            if is_template_file(relative) {
                continue;
            }
            self.copy_file(entry.path(), &self.output_dir.join(relative))?;
            debug!(asset = %relative.display(), "copied static asset");
            copied.push(relative.to_path_buf());
        }
        Ok(copied)
    }

    fn render_book(&self, book: &Book) -> Result<BookOutcome, RenderError> {
        let view = BookView::new(self.collection, book);
        let (index, chapters) = rayon::join(
            || self.render_book_index(&view),
            || {
                (0..view.chapters.len())
                    .into_par_iter()
                    .filter_map(|i| ChapterPage::new(self.collection, &view, i))
                    .try_for_each(|page| {
                        self.render_chapter(&page).map_err(|source| RenderError::Chapter {
                            id: page.chapter.id.clone(),
                            source: Box::new(source),
                        })
                    })
            },
        );
        index?;
        chapters?;

        let mut outcome = BookOutcome {
            chapters: book.chapters.len(),
            ..BookOutcome::default()
        };
        if book.generate.rss {
            self.write_file(&rss_path(&book.id), feed::rss(self.collection, book).into_bytes())?;
            outcome.feed = true;
        }
        if book.generate.epub {
            self.write_epub(book)?;
            outcome.epub = true;
        }
        debug!(book = %book.id, chapters = outcome.chapters, "rendered book");
        Ok(outcome)
    }

    fn render_book_index(&self, view: &BookView<'_>) -> Result<(), RenderError> {
        let book = view.book;
        let html = self.templates.render_book(&BookPage::new(self.collection, view))?;
        self.write_page(&view.path, html)?;

        for asset in [&book.cover, &book.favicon].into_iter().flatten() {
            self.copy_file(
                &book.source_dir.join(asset),
                &self.output_dir.join(book_asset_path(&book.id, asset)),
            )?;
        }
        Ok(())
    }

    fn render_chapter(&self, page: &ChapterPage<'_>) -> Result<(), RenderError> {
        let html = self.templates.render_chapter(page)?;
        self.write_page(&chapter_path(&page.book.book.id, &page.chapter.id), html)
    }

    fn write_epub(&self, book: &Book) -> Result<(), RenderError> {
        let path = self.output_dir.join(epub_path(&book.id));
        let epub_error = |source: EpubError| RenderError::Epub {
            path: path.clone(),
            source,
        };

        let mut builder = EpubBuilder::new(book.title.as_str());
        let identifier = match book.identifiers.first() {
            Some(id) => id.clone(),
            None if book.url.is_empty() => epub::identifier_for(&book.id),
            None => epub::identifier_for(&book.url),
        };
        builder
            .set_identifier(identifier)
            .set_language(book.language_code.as_str())
            .set_stylesheet(EPUB_CSS);
        for author in book.authors.iter().filter(|a| !a.name.is_empty()) {
            builder.set_author(author.name.as_str());
        }
        if !book.title_sort.is_empty() {
            builder.set_title_sort(book.title_sort.as_str());
        }
        if !book.description.is_empty() {
            builder.set_description(book.description.as_str());
        }
        if !book.copyright.is_empty() {
            builder.set_rights(book.copyright.as_str());
        }
        if let Some(series) = &book.series {
            builder.set_series(series.name.as_str(), series.number);
        }
        if let Some(date) = book.published {
            builder.set_published(date);
        }
        if let Some(date) = book.modified.or(book.published_end) {
            builder.set_modified(date);
        }
        if let Some(cover) = &book.cover {
            let source = book.source_dir.join(cover);
            let data = fs::read(&source).map_err(|e| io_error(&source, e))?;
            let name = Path::new(cover)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| cover.clone());
            builder.set_cover(&name, data).map_err(epub_error)?;
        }

        builder.add_section(
            book.title.as_str(),
            format!("<h1>{}</h1>\n{}", escape_xml(&book.title), book.blurb.xhtml),
        );
        for chapter in &book.chapters {
            builder.add_section(
                chapter.title.as_str(),
                format!("<h1>{}</h1>\n{}", escape_xml(&chapter.title), chapter.content.xhtml),
            );
        }

        create_parent(&path)?;
        builder.write(&path).map_err(epub_error)
    }

    /// Write rendered HTML, minified when enabled.
    fn write_page(&self, relative: &str, html: String) -> Result<(), RenderError> {
        let path = self.output_dir.join(relative);
        let bytes = match self.minifier {
            Some(minifier) => minifier
                .minify(minify::HTML, html.as_bytes())
                .map_err(|source| RenderError::Minify {
                    path: path.clone(),
                    source,
                })?,
            None => html.into_bytes(),
        };
        write_bytes(&path, &bytes)
    }

    fn write_file(&self, relative: &str, bytes: Vec<u8>) -> Result<(), RenderError> {
        write_bytes(&self.output_dir.join(relative), &bytes)
    }

    /// Copy `src` to `dst`, minifying when enabled and the type is known.
    /// An existing `dst` is replaced.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), RenderError> {
        let mime = self
            .minifier
            .zip(minify::mime_for_path(src))
            .filter(|(minifier, mime)| minifier.supports(mime));
        match mime {
            Some((minifier, mime)) => {
                let input = fs::read(src).map_err(|e| io_error(src, e))?;
                let output = minifier
                    .minify(mime, &input)
                    .map_err(|source| RenderError::Minify {
                        path: src.to_path_buf(),
                        source,
                    })?;
                write_bytes(dst, &output)
            }
            None => {
                create_parent(dst)?;
                fs::copy(src, dst).map_err(|e| io_error(dst, e))?;
                Ok(())
            }
        }
    }
}

/// Stylesheet bundled into every EPUB.
const EPUB_CSS: &str = "body { font-family: serif; line-height: 1.5; }\nh1 { text-align: center; }\n.cover img { max-width: 100%; }\n";

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    create_parent(path)?;
    fs::write(path, bytes).map_err(|e| io_error(path, e))
}

fn create_parent(path: &Path) -> Result<(), RenderError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| io_error(parent, e)),
        None => Ok(()),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.to_path_buf(),
        source,
    }
}
