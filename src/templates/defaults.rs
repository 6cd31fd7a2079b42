//! Built-in page templates, written with Maud.
//!
//! Used for every role the layout directory does not override. They render
//! the same context structs user templates receive, so an override can
//! start from the HTML these produce.
//!
//! Nothing here reads `collection.build_time` or any other clock-derived
//! value: two builds of unchanged content produce identical pages.

use super::context::{BookPage, BookView, ChapterLink, ChapterPage, CollectionPage};
use crate::types::{Author, Collection};
use chrono::{DateTime, FixedOffset};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../../static/style.css");

/// Display format for dates in the built-in pages.
const DATE_FORMAT: &str = "%B %-d, %Y";

fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.format(DATE_FORMAT).to_string()
}

struct Head<'a> {
    lang: &'a str,
    title: &'a str,
    description: &'a str,
    root: &'a str,
    favicon: Option<&'a str>,
    feed: Option<(&'a str, &'a str)>,
}

fn base_document(head: Head<'_>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(head.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (head.title) }
                @if !head.description.is_empty() {
                    meta name="description" content=(head.description);
                }
                @if let Some(icon) = head.favicon {
                    link rel="icon" href={ (head.root) (icon) };
                }
                @if let Some((title, href)) = head.feed {
                    link rel="alternate" type="application/rss+xml" title=(title) href={ (head.root) (href) };
                }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(collection: &Collection, root: &str) -> Markup {
    html! {
        header.site-header {
            a.site-title href={ (root) "index.html" } { (collection.title) }
        }
    }
}

fn site_footer(collection: &Collection) -> Markup {
    html! {
        @if !collection.copyright.is_empty() {
            footer { (collection.copyright) }
        }
    }
}

fn byline(authors: &[Author]) -> Markup {
    let names: Vec<&str> = authors
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    html! {
        @if !names.is_empty() {
            p.byline { "by " (names.join(", ")) }
        }
    }
}

fn table_of_contents(root: &str, chapters: &[ChapterLink<'_>]) -> Markup {
    html! {
        ol.toc {
            @for chapter in chapters {
                li {
                    a href={ (root) (chapter.path) } { (chapter.title) }
                    @if let Some(date) = &chapter.published {
                        " "
                        span.meta { "· " (format_date(date)) }
                    }
                }
            }
        }
    }
}

fn book_summary(root: &str, view: &BookView<'_>) -> Markup {
    let book = view.book;
    html! {
        li {
            a href={ (root) (view.path) } { strong { (book.title) } }
            @if !book.subtitle.is_empty() {
                " " span.muted { (book.subtitle) }
            }
            @if let Some(status) = book.parsed_status() {
                " " span.meta { "(" (status) ")" }
            }
        }
    }
}

/// The collection index: every book with a short summary.
pub fn collection_page(page: &CollectionPage<'_>) -> Markup {
    let collection = page.collection;
    let content = html! {
        (site_header(collection, page.root))
        main {
            h1 { (collection.title) }
            @if !collection.description.is_empty() {
                p.muted { (collection.description) }
            }
            @if page.books.is_empty() {
                p { "No books yet." }
            } @else {
                ul.book-list {
                    @for view in &page.books {
                        (book_summary(page.root, view))
                    }
                }
            }
        }
        (site_footer(collection))
    };
    base_document(
        Head {
            lang: &collection.language_code,
            title: &collection.title,
            description: &collection.description,
            root: page.root,
            favicon: page.favicon_path.as_deref(),
            feed: None,
        },
        content,
    )
}

/// A book's landing page: cover, blurb, links and table of contents.
pub fn book_page(page: &BookPage<'_>) -> Markup {
    let collection = page.collection;
    let view = page.book;
    let book = view.book;
    let content = html! {
        (site_header(collection, page.root))
        main {
            @if let Some(cover) = &view.cover_path {
                img.cover src={ (page.root) (cover) } alt={ "Cover of " (book.title) };
            }
            h1 { (book.title) }
            @if !book.subtitle.is_empty() {
                p.muted { (book.subtitle) }
            }
            (byline(&book.authors))
            @if let Some(series) = &book.series {
                p.meta { (series.name) " #" (series.number) }
            }
            @if let Some(start) = &book.published {
                p.meta {
                    (format_date(start))
                    @if let Some(end) = book.published_end.as_ref().filter(|end| *end != start) {
                        " – " (format_date(end))
                    }
                }
            }
            @if !book.blurb.html.is_empty() {
                section.blurb { (PreEscaped(&book.blurb.html)) }
            }
            @if view.rss_path.is_some() || view.epub_path.is_some() {
                p.downloads {
                    @if let Some(epub) = &view.epub_path {
                        a href={ (page.root) (epub) } { "Download EPUB" }
                    }
                    @if view.rss_path.is_some() && view.epub_path.is_some() {
                        " · "
                    }
                    @if let Some(rss) = &view.rss_path {
                        a href={ (page.root) (rss) } { "RSS feed" }
                    }
                }
            }
            h2 { "Table of Contents" }
            @if view.chapters.is_empty() {
                p.muted { "No chapters yet." }
            } @else {
                (table_of_contents(page.root, &view.chapters))
            }
        }
        (site_footer(collection))
    };
    base_document(
        Head {
            lang: &book.language_code,
            title: &book.title,
            description: &book.description,
            root: page.root,
            favicon: page.favicon_path.as_deref(),
            feed: view.rss_path.as_deref().map(|rss| (book.title.as_str(), rss)),
        },
        content,
    )
}

/// A single chapter with previous/next navigation.
pub fn chapter_page(page: &ChapterPage<'_>) -> Markup {
    let collection = page.collection;
    let view = page.book;
    let chapter = page.chapter;
    let title = format!("{} · {}", chapter.title, view.book.title);
    let content = html! {
        (site_header(collection, page.root))
        main {
            article {
                p.meta { a href={ (page.root) (view.path) } { (view.book.title) } }
                h1 { (chapter.title) }
                @if !chapter.subtitle.is_empty() {
                    p.muted { (chapter.subtitle) }
                }
                p.meta {
                    @if let Some(date) = &chapter.published {
                        (format_date(date)) " · "
                    }
                    (chapter.reading_minutes) " min read"
                }
                (PreEscaped(&chapter.content.html))
            }
            nav.chapter-nav {
                @if let Some(previous) = page.previous {
                    a.previous rel="prev" href={ (page.root) (previous.path) } { "← Previous: " (previous.title) }
                } @else {
                    span {}
                }
                a.contents href={ (page.root) (view.path) } { "Contents" }
                @if let Some(next) = page.next {
                    a.next rel="next" href={ (page.root) (next.path) } { "Next: " (next.title) " →" }
                } @else {
                    span {}
                }
            }
        }
        (site_footer(collection))
    };
    base_document(
        Head {
            lang: &chapter.language_code,
            title: &title,
            description: &chapter.description,
            root: page.root,
            favicon: page.favicon_path.as_deref(),
            feed: view
                .rss_path
                .as_deref()
                .map(|rss| (view.book.title.as_str(), rss)),
        },
        content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::sort_and_link;
    use crate::test_helpers::*;
    use crate::types::Collection;

    fn sample() -> Collection {
        let mut collection = blank_collection();
        collection.title = "My Writing".into();
        collection.language_code = "en".into();
        let mut book = blank_book();
        book.id = "moon".into();
        book.title = "Moon & Stars".into();
        book.language_code = "en".into();
        book.blurb.html = "<p>A <em>blurb</em>.</p>".into();
        let mut first = blank_chapter("first");
        first.order = 1;
        first.title = "First".into();
        first.content.html = "<p>Hello.</p>".into();
        let mut second = blank_chapter("second");
        second.order = 2;
        second.title = "Second".into();
        book.chapters = vec![second, first];
        sort_and_link(&mut book.chapters);
        collection.books.push(book);
        collection
    }

    #[test]
    fn collection_page_lists_books() {
        let collection = sample();
        let html = collection_page(&CollectionPage::new(&collection)).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>My Writing</h1>"));
        assert!(html.contains(r#"href="books/moon/index.html""#));
        // escaped
        assert!(html.contains("Moon &amp; Stars"));
    }

    #[test]
    fn book_page_has_toc_in_order() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let html = book_page(&BookPage::new(&collection, &view)).into_string();
        let first = html.find("chapters/first.html").unwrap();
        let second = html.find("chapters/second.html").unwrap();
        assert!(first < second);
        assert!(html.contains("<em>blurb</em>"));
        assert!(html.contains("Download EPUB"));
        assert!(html.contains(r#"href="../../books/moon/rss.xml""#));
    }

    #[test]
    fn first_chapter_has_next_but_no_previous() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let page = ChapterPage::new(&collection, &view, 0).unwrap();
        let html = chapter_page(&page).into_string();
        assert!(!html.contains("Previous"));
        assert!(html.contains(r#"rel="next" href="../../../books/moon/chapters/second.html""#));
        assert!(html.contains("<p>Hello.</p>"));
    }

    #[test]
    fn last_chapter_has_previous_but_no_next() {
        let collection = sample();
        let view = BookView::new(&collection, &collection.books[0]);
        let page = ChapterPage::new(&collection, &view, 1).unwrap();
        let html = chapter_page(&page).into_string();
        assert!(html.contains("Previous: First"));
        assert!(!html.contains(r#"rel="next""#));
    }
}
