//! # bookgen
//!
//! A static site generator for serialized fiction. A collection holds books,
//! a book holds chapters, and every chapter is a markdown file. The output is
//! a browsable HTML site plus, per book, an RSS feed and an EPUB.
//!
//! # Architecture: Decode, Validate, Render
//!
//! ```text
//! 1. Decode    content root  →  Collection   (config + markdown → document graph)
//! 2. Validate  Collection    →  ()           (required fields, status, assets)
//! 3. Render    Collection    →  out/         (HTML, RSS, EPUB, static assets)
//! ```
//!
//! Decoding is the only stage that mutates the graph. Once chapters are
//! sorted and linked the collection is frozen, and validation and rendering
//! borrow it immutably. That is what lets the renderer hand the same
//! `&Collection` to every worker thread.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | YAML/TOML loading, key folding, typed projection with a params bag, inherited defaults |
//! | [`dates`] | The date format cascade shared by configs and front matter |
//! | [`markdown`] | Markdown → HTML with front-matter extraction, behind a trait |
//! | [`scan`] | Walks the content root, builds the collection and its books |
//! | [`decode`] | Parallel chapter decoding into index-stable slots |
//! | [`order`] | Chapter sort key, previous/next linking, book date ranges |
//! | [`validate`] | Structural checks on the decoded collection |
//! | [`templates`] | Page contexts, built-in Maud pages, Handlebars overrides |
//! | [`render`] | Output directory management and parallel page rendering |
//! | [`feed`] | RSS 2.0 per book |
//! | [`epub`] | EPUB 3 writer |
//! | [`minify`] | MIME-keyed HTML/CSS/JS/SVG minification |
//! | [`pipeline`] | `check` and `build` entry points |
//! | [`output`] | CLI output formatting |
//! | [`types`] | The document graph: `Collection`, `Book`, `Chapter` |
//!
//! # Design Decisions
//!
//! ## Arena Instead of Back-Pointers
//!
//! Chapters refer to their book and neighbours by index, not by reference.
//! The graph has a single owner, no `Rc`/`RefCell`, and is trivially
//! `Sync`. Templates never see the indices directly; the page contexts in
//! [`templates::context`] resolve them into link records.
//!
//! ## Known Fields Plus a Params Bag
//!
//! Config keys are matched case- and separator-insensitively against typed
//! records. Anything unrecognized is kept, with its original spelling, in a
//! `params` map that templates can read. Writers can add their own metadata
//! without the generator knowing about it.
//!
//! ## Built-in Pages in Maud, Overrides in Handlebars
//!
//! The default pages are compiled in with [Maud](https://maud.lambda.xyz/):
//! malformed HTML is a build error and all interpolation is escaped. A
//! collection can replace any page with a Handlebars file in its layout
//! directory. Overrides receive exactly the context the built-in page
//! renders from, and run in strict mode so a typo in a field name fails
//! the build instead of rendering blank.
//!
//! ## Reproducible Output
//!
//! Nothing rendered depends on the clock: the built-in pages ignore the
//! build time, feeds and EPUBs take their dates from content, EPUB
//! identifiers are content digests and zip entries carry a fixed timestamp.
//! Building unchanged content twice yields identical files.

pub mod config;
pub mod dates;
pub mod decode;
pub mod epub;
pub mod feed;
pub mod markdown;
pub mod minify;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod templates;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
