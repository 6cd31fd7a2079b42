//! CLI output formatting for `check` and `build`.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every book and
//! chapter leads with its positional index and title; filesystem paths come
//! second, as indented `Source:` lines or after a `→`. The result reads as a
//! content inventory while still pointing back at the files involved.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Books
//! 001 Moonlight (3 chapters)
//!     Source: books/moonlight/
//!     Status: ongoing
//!     A short story told over three nights.
//!     001 The Lamp
//!         Source: chapters/b-the-lamp.md
//!     002 Night Walk
//!         Source: chapters/a-night-walk.md
//!         Published: 2024-03-09
//!
//! Config
//!     bookgen.yml
//!     layouts/
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! 001 Moonlight → books/moonlight/index.html
//!     001 The Lamp → books/moonlight/chapters/b-the-lamp.html
//!     RSS → books/moonlight/rss.xml
//!     EPUB → books/moonlight/moonlight.epub
//!
//! Assets
//!     css/site.css
//!
//! Rendered 1 book, 3 chapters, 1 feed, 1 EPUB, 1 asset
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::{self, COLLECTION_CONFIG_STEM};
use crate::pipeline::BuildReport;
use crate::scan::BOOKS_DIR;
use crate::templates::context::{BookView, book_index_path};
use crate::types::{Book, Collection};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with optional
/// chapter count.
///
/// ```text
/// 001 Moonlight (3 chapters)
/// 002 The Lamp
/// ```
fn entity_header(index: usize, title: &str, chapters: Option<usize>) -> String {
    match chapters {
        Some(n) => format!("{} {} ({})", format_index(index), title, plural(n, "chapter")),
        None => format!("{} {}", format_index(index), title),
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// First line of a blurb as plain text.
fn blurb_preview(book: &Book) -> String {
    let plain = strip_html_tags(&book.blurb.html);
    let first = plain.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate_desc(first, 60)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// check
// ============================================================================

/// Format the decoded collection as a content inventory.
pub fn format_check_output(collection: &Collection) -> Vec<String> {
    let mut lines = vec!["Books".to_string()];

    if collection.books.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, book) in collection.books.iter().enumerate() {
        lines.push(entity_header(i + 1, &book.title, Some(book.chapters.len())));
        lines.push(format!(
            "{}Source: {}/{}/",
            indent(1),
            BOOKS_DIR,
            file_name(&book.source_dir)
        ));
        if let Some(status) = &book.status {
            lines.push(format!("{}Status: {}", indent(1), status));
        }
        let preview = blurb_preview(book);
        if !preview.is_empty() {
            lines.push(format!("{}{}", indent(1), preview));
        }

        for (j, chapter) in book.chapters.iter().enumerate() {
            lines.push(format!("{}{}", indent(1), entity_header(j + 1, &chapter.title, None)));
            lines.push(format!(
                "{}Source: chapters/{}",
                indent(2),
                file_name(&chapter.source_path)
            ));
            if let Some(date) = chapter.published {
                lines.push(format!("{}Published: {}", indent(2), date.format("%Y-%m-%d")));
            }
        }
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if let Some(path) = config::find_config(&collection.source_dir, COLLECTION_CONFIG_STEM) {
        lines.push(format!("{}{}", indent(1), file_name(&path)));
    }
    let layouts = collection.source_dir.join(crate::pipeline::DEFAULT_LAYOUTS_DIR);
    if layouts.is_dir() {
        lines.push(format!("{}{}/", indent(1), crate::pipeline::DEFAULT_LAYOUTS_DIR));
    }

    lines
}

/// Print check output to stdout.
pub fn print_check_output(collection: &Collection) {
    for line in format_check_output(collection) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format the pages and files a build wrote.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let collection = &report.collection;
    let mut lines = vec!["Home \u{2192} index.html".to_string()];

    for (i, book) in collection.books.iter().enumerate() {
        let view = BookView::new(collection, book);
        lines.push(format!(
            "{} \u{2192} {}",
            entity_header(i + 1, &book.title, None),
            book_index_path(&book.id)
        ));
        for (j, link) in view.chapters.iter().enumerate() {
            lines.push(format!(
                "{}{} \u{2192} {}",
                indent(1),
                entity_header(j + 1, link.title, None),
                link.path
            ));
        }
        if let Some(rss) = &view.rss_path {
            lines.push(format!("{}RSS \u{2192} {}", indent(1), rss));
        }
        if let Some(epub) = &view.epub_path {
            lines.push(format!("{}EPUB \u{2192} {}", indent(1), epub));
        }
    }

    let render = &report.render;
    if !render.assets.is_empty() {
        lines.push(String::new());
        lines.push("Assets".to_string());
        for asset in &render.assets {
            lines.push(format!("{}{}", indent(1), asset.display()));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Rendered {}, {}, {}, {} {}, {}",
        plural(render.books, "book"),
        plural(render.chapters, "chapter"),
        plural(render.feeds, "feed"),
        render.epubs,
        if render.epubs == 1 { "EPUB" } else { "EPUBs" },
        plural(render.assets.len(), "asset"),
    ));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}
