//! RSS 2.0 feed per book.
//!
//! One `<item>` per chapter in sorted order. Links and guids are absolute,
//! built from the collection base URL. Dates come only from content (never
//! the clock), so the feed is as reproducible as the HTML.

use crate::epub::escape_xml;
use crate::scan::join_url;
use crate::templates::context::{chapter_path, rss_path};
use crate::types::{Book, Chapter, Collection};

/// Render the feed for `book`.
pub fn rss(collection: &Collection, book: &Book) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n  <channel>\n",
    );
    push_element(&mut xml, 4, "title", &book.title);
    push_element(&mut xml, 4, "link", &book.url);
    let description = if book.description.is_empty() {
        &book.title
    } else {
        &book.description
    };
    push_element(&mut xml, 4, "description", description);
    if !book.language_code.is_empty() {
        push_element(&mut xml, 4, "language", &book.language_code);
    }
    if !book.copyright.is_empty() {
        push_element(&mut xml, 4, "copyright", &book.copyright);
    }
    if let Some(updated) = last_updated(book) {
        push_element(&mut xml, 4, "lastBuildDate", &updated);
    }
    push_element(&mut xml, 4, "generator", "bookgen");
    xml.push_str(&format!(
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(&join_url(&collection.base_url, &rss_path(&book.id)))
    ));

    for chapter in &book.chapters {
        push_item(&mut xml, collection, book, chapter);
    }

    xml.push_str("  </channel>\n</rss>\n");
    xml
}

fn push_item(xml: &mut String, collection: &Collection, book: &Book, chapter: &Chapter) {
    let link = join_url(&collection.base_url, &chapter_path(&book.id, &chapter.id));
    xml.push_str("    <item>\n");
    push_element(xml, 6, "title", &chapter.title);
    push_element(xml, 6, "link", &link);
    xml.push_str(&format!(
        "      <guid isPermaLink=\"true\">{}</guid>\n",
        escape_xml(&link)
    ));
    if let Some(date) = chapter.published {
        push_element(xml, 6, "pubDate", &date.to_rfc2822());
    }
    let summary = if chapter.description.is_empty() {
        &chapter.content.html
    } else {
        &chapter.description
    };
    if !summary.is_empty() {
        push_element(xml, 6, "description", summary);
    }
    xml.push_str("    </item>\n");
}

fn push_element(xml: &mut String, indent: usize, name: &str, value: &str) {
    xml.push_str(&format!(
        "{:indent$}<{name}>{}</{name}>\n",
        "",
        escape_xml(value)
    ));
}

/// Latest of the book's modify date and its chapters' dates.
fn last_updated(book: &Book) -> Option<String> {
    book.chapters
        .iter()
        .flat_map(|c| [c.published, c.modified])
        .chain([book.modified, book.published_end])
        .flatten()
        .max()
        .map(|d| d.to_rfc2822())
}
