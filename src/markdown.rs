//! Markdown to HTML conversion with front-matter extraction.
//!
//! The pipeline depends only on [`MarkdownConverter`]: raw source in,
//! rendered HTML plus the front-matter bag out. [`CommonMark`] is the
//! pulldown-cmark implementation used by the CLI. One converter is built per
//! build and shared by reference with every decode worker, hence `Sync`.
//!
//! Front matter is a YAML block delimited by `---` at the very top of the
//! file (closed by `---` or `...`). pulldown-cmark reports it as a metadata
//! block; its text is collected and parsed with serde_yaml while the rest of
//! the event stream goes to the HTML writer.
//!
//! Every conversion also yields an XHTML rendition for EPUB sections. The
//! event stream is the same except that raw HTML is dropped: it is not
//! guaranteed to be well-formed XML.

use crate::config::{self, Bag};
use pulldown_cmark::{Event, MetadataBlockKind, Options, Parser, Tag, TagEnd, html};
use thiserror::Error;

/// Words per minute used for [`Converted::reading_minutes`].
const WORDS_PER_MINUTE: usize = 200;

/// Stands in for raw HTML in the XHTML rendition.
const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("invalid YAML front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
    #[error("front matter must be a key/value mapping")]
    NotAMapping,
}

/// Output of one conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Converted {
    pub html: String,
    /// Same content with raw HTML left out.
    pub xhtml: String,
    pub front_matter: Bag,
    /// Words in the body text, front matter excluded.
    pub words: usize,
}

impl Converted {
    /// Estimated reading time, never below one minute.
    pub fn reading_minutes(&self) -> usize {
        self.words.div_ceil(WORDS_PER_MINUTE).max(1)
    }
}

/// Converts Markdown source to HTML.
pub trait MarkdownConverter: Sync {
    fn convert(&self, source: &str) -> Result<Converted, MarkdownError>;
}

/// CommonMark plus the usual extensions, backed by pulldown-cmark.
#[derive(Debug, Clone, Copy)]
pub struct CommonMark {
    options: Options,
}

impl CommonMark {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_SMART_PUNCTUATION
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_DEFINITION_LIST
                | Options::ENABLE_HEADING_ATTRIBUTES
                | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS,
        }
    }
}

impl Default for CommonMark {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for CommonMark {
    fn convert(&self, source: &str) -> Result<Converted, MarkdownError> {
        let mut yaml = String::new();
        let mut in_metadata = false;
        let mut words = 0;

        let events: Vec<Event<'_>> = Parser::new_ext(source, self.options)
            .filter_map(|event| match event {
                Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                    in_metadata = true;
                    None
                }
                Event::End(TagEnd::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                    in_metadata = false;
                    None
                }
                Event::Text(text) if in_metadata => {
                    yaml.push_str(&text);
                    None
                }
                Event::Text(text) => {
                    words += text.split_whitespace().count();
                    Some(Event::Text(text))
                }
                other => Some(other),
            })
            .collect();

        let mut html_out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut html_out, events.iter().cloned());

        // a multi-line HTML block arrives as one event per line
        let mut in_raw = false;
        let xhtml_events = events.into_iter().filter_map(|event| {
            let raw = matches!(event, Event::Html(_) | Event::InlineHtml(_));
            let was_raw = std::mem::replace(&mut in_raw, raw);
            match event {
                Event::Html(_) | Event::InlineHtml(_) if was_raw => None,
                Event::Html(_) => Some(Event::Html(RAW_HTML_OMITTED.into())),
                Event::InlineHtml(_) => Some(Event::InlineHtml(RAW_HTML_OMITTED.into())),
                other => Some(other),
            }
        });
        let mut xhtml_out = String::with_capacity(html_out.len());
        html::push_html(&mut xhtml_out, xhtml_events);

        let front_matter = config::into_bag(config::parse_yaml(&yaml)?)
            .ok_or(MarkdownError::NotAMapping)?;

        Ok(Converted {
            html: html_out,
            xhtml: xhtml_out,
            front_matter,
            words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn convert(source: &str) -> Converted {
        CommonMark::new().convert(source).unwrap()
    }

    #[test]
    fn xhtml_drops_raw_html() {
        let out = convert("Line one<br>line two.\n\n<div class=\"aside\">\n<p>Note</p>\n</div>\n\nAfter.\n");
        assert!(out.html.contains("<br>"));
        assert!(out.html.contains("<div class=\"aside\">"));
        assert!(!out.xhtml.contains("<br>"));
        assert!(!out.xhtml.contains("<div"));
        assert_eq!(out.xhtml.matches(RAW_HTML_OMITTED).count(), 2);
        assert!(out.xhtml.contains("Line one"));
        assert!(out.xhtml.contains("<p>After.</p>"));
    }

    #[test]
    fn xhtml_closes_void_elements() {
        let out = convert("a  \nb\n\n---\n\n![x](x.png)\n");
        assert!(out.xhtml.contains("<br />"));
        assert!(out.xhtml.contains("<hr />"));
        assert!(out.xhtml.contains("<img src=\"x.png\" alt=\"x\" />"));
    }

    #[test]
    fn task_lists_and_definition_lists() {
        let out = convert("- [x] done\n- [ ] todo\n\nTerm\n: Definition\n");
        assert!(out.html.contains("type=\"checkbox\""));
        assert!(out.html.contains("<dt>Term</dt>"));
        assert!(out.html.contains("<dd>Definition</dd>"));
    }

    #[test]
    fn renders_plain_markdown() {
        let out = convert("# Hello\n\nSome *text*.\n");
        assert!(out.html.contains("<h1>Hello</h1>"));
        assert!(out.html.contains("<em>text</em>"));
        assert!(out.front_matter.is_empty());
    }

    #[test]
    fn extracts_front_matter_and_hides_it() {
        let out = convert("---\ntitle: Night\norder: 2\n---\n\nBody here.\n");
        assert_eq!(out.front_matter["title"], Value::from("Night"));
        assert_eq!(out.front_matter["order"], Value::from(2));
        assert!(!out.html.contains("title: Night"));
        assert!(out.html.contains("<p>Body here.</p>"));
    }

    #[test]
    fn dot_terminated_front_matter() {
        let out = convert("---\ntitle: Dots\n...\n\nText\n");
        assert_eq!(out.front_matter["title"], Value::from("Dots"));
    }

    #[test]
    fn malformed_front_matter_is_an_error() {
        let result = CommonMark::new().convert("---\ntitle: [oops\n---\n\nText\n");
        assert!(matches!(result, Err(MarkdownError::FrontMatter(_))));
    }

    #[test]
    fn tables_and_strikethrough_enabled() {
        let out = convert("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("<del>gone</del>"));
    }

    #[test]
    fn counts_body_words_only() {
        let out = convert("---\ntitle: one two three\n---\n\nfour five six seven\n");
        assert_eq!(out.words, 4);
        assert_eq!(out.reading_minutes(), 1);
    }

    #[test]
    fn reading_time_rounds_up() {
        let body = "word ".repeat(450);
        let out = convert(&body);
        assert_eq!(out.reading_minutes(), 3);
    }
}
