//! Data bound to each page template.
//!
//! Built-in and user templates receive the same structures, serialized with
//! serde. Every page carries `root`, the relative prefix from that page back
//! to the output root, so `{{root}}{{book.path}}` works from any depth and
//! the site can be browsed straight from disk.
//!
//! Optional values serialize as `null` rather than being omitted: user
//! templates run in strict mode, where a missing key is an error but a
//! `null` one is simply falsy in `{{#if}}`.

use crate::scan::join_url;
use crate::types::{Book, Chapter, Collection};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// `books/<id>/index.html`
pub fn book_index_path(book_id: &str) -> String {
    format!("books/{book_id}/index.html")
}

/// `books/<id>/chapters/<chapter>.html`
pub fn chapter_path(book_id: &str, chapter_id: &str) -> String {
    format!("books/{book_id}/chapters/{chapter_id}.html")
}

/// `books/<id>/rss.xml`
pub fn rss_path(book_id: &str) -> String {
    format!("books/{book_id}/rss.xml")
}

/// `books/<id>/<id>.epub`
pub fn epub_path(book_id: &str) -> String {
    format!("books/{book_id}/{book_id}.epub")
}

/// `books/<id>/<asset>` for covers and book favicons.
pub fn book_asset_path(book_id: &str, asset: &str) -> String {
    format!("books/{book_id}/{}", asset.trim_start_matches('/'))
}

/// A reference to a chapter, used for tables of contents and prev/next.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterLink<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub subtitle: &'a str,
    pub order: i64,
    pub published: Option<DateTime<FixedOffset>>,
    pub reading_minutes: usize,
    /// `<id>.html`, relative to the book's `chapters/` directory.
    pub file_name: String,
    /// Relative to the output root.
    pub path: String,
    /// Absolute, built from the collection base URL.
    pub url: String,
}

impl<'a> ChapterLink<'a> {
    pub fn new(collection: &Collection, book: &Book, chapter: &'a Chapter) -> Self {
        let path = chapter_path(&book.id, &chapter.id);
        Self {
            id: &chapter.id,
            title: &chapter.title,
            subtitle: &chapter.subtitle,
            order: chapter.order,
            published: chapter.published,
            reading_minutes: chapter.reading_minutes,
            file_name: format!("{}.html", chapter.id),
            url: join_url(&collection.base_url, &path),
            path,
        }
    }
}

/// A book plus everything a template needs to link to it and its parts.
#[derive(Debug, Clone, Serialize)]
pub struct BookView<'a> {
    #[serde(flatten)]
    pub book: &'a Book,
    /// Index page, relative to the output root.
    pub path: String,
    pub chapters: Vec<ChapterLink<'a>>,
    pub cover_path: Option<String>,
    pub favicon_path: Option<String>,
    pub rss_path: Option<String>,
    pub epub_path: Option<String>,
}

impl<'a> BookView<'a> {
    pub fn new(collection: &Collection, book: &'a Book) -> Self {
        Self {
            book,
            path: book_index_path(&book.id),
            chapters: book
                .chapters
                .iter()
                .map(|c| ChapterLink::new(collection, book, c))
                .collect(),
            cover_path: book.cover.as_deref().map(|c| book_asset_path(&book.id, c)),
            favicon_path: book.favicon.as_deref().map(|f| book_asset_path(&book.id, f)),
            rss_path: book.generate.rss.then(|| rss_path(&book.id)),
            epub_path: book.generate.epub.then(|| epub_path(&book.id)),
        }
    }
}

/// Context for `index.html` at the output root.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionPage<'a> {
    pub root: &'static str,
    pub collection: &'a Collection,
    pub books: Vec<BookView<'a>>,
    pub favicon_path: Option<String>,
}

impl<'a> CollectionPage<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self {
            root: "",
            collection,
            books: collection
                .books
                .iter()
                .map(|b| BookView::new(collection, b))
                .collect(),
            favicon_path: collection.favicon.clone(),
        }
    }
}

/// Context for `books/<id>/index.html`.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage<'a> {
    pub root: &'static str,
    pub collection: &'a Collection,
    pub book: &'a BookView<'a>,
    pub favicon_path: Option<String>,
}

impl<'a> BookPage<'a> {
    pub fn new(collection: &'a Collection, book: &'a BookView<'a>) -> Self {
        Self {
            root: "../../",
            collection,
            book,
            favicon_path: page_favicon(collection, book),
        }
    }
}

/// Context for `books/<id>/chapters/<chapter>.html`.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterPage<'a> {
    pub root: &'static str,
    pub collection: &'a Collection,
    pub book: &'a BookView<'a>,
    pub chapter: &'a Chapter,
    pub previous: Option<&'a ChapterLink<'a>>,
    pub next: Option<&'a ChapterLink<'a>>,
    pub favicon_path: Option<String>,
}

impl<'a> ChapterPage<'a> {
    /// `index` is the chapter's position in the book's sorted sequence.
    pub fn new(collection: &'a Collection, book: &'a BookView<'a>, index: usize) -> Option<Self> {
        let chapter = book.book.chapters.get(index)?;
        Some(Self {
            root: "../../../",
            collection,
            book,
            chapter,
            previous: chapter.previous.and_then(|i| book.chapters.get(i)),
            next: chapter.next.and_then(|i| book.chapters.get(i)),
            favicon_path: page_favicon(collection, book),
        })
    }
}

/// The book's own favicon if it has one, else the collection's.
fn page_favicon(collection: &Collection, book: &BookView<'_>) -> Option<String> {
    book.favicon_path
        .clone()
        .or_else(|| collection.favicon.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::sort_and_link;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Collection {
        let mut collection = blank_collection();
        collection.title = "Shelf".into();
        collection.base_url = "https://ex.test/".into();
        collection.favicon = Some("icon.png".into());
        let mut book = blank_book();
        book.id = "moon".into();
        book.title = "Moon".into();
        book.cover = Some("art/cover.jpg".into());
        book.generate.epub = false;
        book.chapters = vec![blank_chapter("one"), blank_chapter("two")];
        sort_and_link(&mut book.chapters);
        collection.books.push(book);
        collection
    }

    #[test]
    fn chapter_links_carry_paths_and_urls() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let link = &view.chapters[1];
        assert_eq!(link.file_name, "two.html");
        assert_eq!(link.path, "books/moon/chapters/two.html");
        assert_eq!(link.url, "https://ex.test/books/moon/chapters/two.html");
    }

    #[test]
    fn book_view_paths_follow_generate_flags() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        assert_eq!(view.path, "books/moon/index.html");
        assert_eq!(view.cover_path.as_deref(), Some("books/moon/art/cover.jpg"));
        assert_eq!(view.rss_path.as_deref(), Some("books/moon/rss.xml"));
        assert_eq!(view.epub_path, None);
    }

    #[test]
    fn chapter_page_resolves_neighbours() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let first = ChapterPage::new(&collection, &view, 0).unwrap();
        assert!(first.previous.is_none());
        assert_eq!(first.next.map(|n| n.id), Some("two"));
        let last = ChapterPage::new(&collection, &view, 1).unwrap();
        assert_eq!(last.previous.map(|p| p.id), Some("one"));
        assert!(last.next.is_none());
        assert!(ChapterPage::new(&collection, &view, 2).is_none());
    }

    #[test]
    fn book_fields_flatten_into_the_view() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Moon");
        assert_eq!(json["chapters"][0]["id"], "one");
        assert!(json["series"].is_null());
        assert!(json.get("source_dir").is_none());
    }

    #[test]
    fn pages_fall_back_to_collection_favicon() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let page = BookPage::new(&collection, &view);
        assert_eq!(page.favicon_path.as_deref(), Some("icon.png"));
        assert_eq!(page.root, "../../");
    }
}
