//! Collection, book and front-matter configuration.
//!
//! Every node in the content tree carries a small config document: the
//! collection has `bookgen.{yml,yaml,toml}` at the root, each book has
//! `bookgen-book.{yml,yaml,toml}` in its directory, and each chapter has a
//! YAML front-matter block. All three go through the same two steps.
//!
//! ## 1. Load into a bag
//!
//! The file is parsed into a permissive key/value bag (a JSON object) without
//! any schema. YAML and TOML both land in the same representation; TOML
//! datetimes become strings so the date cascade in [`crate::dates`] sees them.
//!
//! ## 2. Project onto a typed record
//!
//! Keys are matched against the typed record's fields ignoring case, `_` and
//! `-`, so all of these set the same field:
//!
//! ```yaml
//! languageCode: fr
//! language_code: fr
//! LanguageCode: fr
//! language-code: fr
//! ```
//!
//! Recognized keys (and, recursively, the keys of nested records such as
//! `authors` and `series`) are folded and deserialized with serde. Keys the
//! record does not know are kept verbatim in a [`Params`] bag, so templates
//! can read `{{book.params.Illustrator}}` without the generator knowing
//! about illustrators.
//!
//! ## Inherited defaults
//!
//! Before projecting, the recognized section is merged on top of a defaults
//! document: stock values for the collection, the collection's values for a
//! book, the book's values for a chapter. Loaded values always win.
//!
//! ```text
//! stock defaults ─▶ bookgen.toml ─▶ Collection
//!                        │ language_code, generate
//!                        ▼
//!                   bookgen-book.toml ─▶ Book
//!                        │ language_code, authors, copyright
//!                        ▼
//!                   chapter front matter ─▶ Chapter
//! ```

use crate::dates::DateInput;
use crate::types::{Author, GenerateSettings, Params, Series};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A parsed but unprojected config document.
pub type Bag = Map<String, Value>;

/// File stem of the collection config at the content root.
pub const COLLECTION_CONFIG_STEM: &str = "bookgen";
/// File stem of the per-book config inside `books/<id>/`.
pub const BOOK_CONFIG_STEM: &str = "bookgen-book";
/// Extensions tried in order; the first existing file wins.
pub const CONFIG_EXTENSIONS: &[&str] = &["yml", "yaml", "toml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no {stem}.{{yml,yaml,toml}} found in `{}`", dir.display())]
    Missing { dir: PathBuf, stem: &'static str },
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML in `{}`: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse TOML in `{}`: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("`{}` must contain a key/value mapping at the top level", path.display())]
    NotAMapping { path: PathBuf },
    #[error("invalid value in `{}`: {source}", path.display())]
    Shape {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Typed records
// =============================================================================

/// A typed record that can be projected out of a [`Bag`].
pub trait KnownFields {
    /// Folded names (see [`fold_key`]) of every field and alias.
    const FIELDS: &'static [&'static str];

    /// `(alias, canonical)` pairs, folded. The canonical key wins when a
    /// document carries both.
    const ALIASES: &'static [(&'static str, &'static str)] = &[];
}

/// Collection-level settings from `bookgen.{yml,yaml,toml}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub title: String,
    pub description: String,
    #[serde(rename = "baseurl")]
    pub base_url: String,
    #[serde(rename = "languagecode")]
    pub language_code: String,
    pub favicon: Option<String>,
    pub copyright: String,
    pub generate: GenerateSettings,
}

impl KnownFields for CollectionConfig {
    const FIELDS: &'static [&'static str] = &[
        "title",
        "description",
        "baseurl",
        "languagecode",
        "favicon",
        "faviconimagename",
        "copyright",
        "generate",
    ];
    const ALIASES: &'static [(&'static str, &'static str)] = &[("faviconimagename", "favicon")];
}

/// Book-level settings from `bookgen-book.{yml,yaml,toml}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub id: Option<String>,
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "titlesort")]
    pub title_sort: String,
    pub description: String,
    pub authors: Vec<Author>,
    pub series: Option<Series>,
    pub status: Option<String>,
    pub cover: Option<String>,
    pub favicon: Option<String>,
    #[serde(rename = "languagecode")]
    pub language_code: String,
    pub copyright: String,
    pub identifiers: Vec<String>,
    pub tags: Vec<String>,
    pub published: Option<DateInput>,
    #[serde(rename = "publishedend")]
    pub published_end: Option<DateInput>,
    pub modified: Option<DateInput>,
    pub generate: GenerateSettings,
}

impl KnownFields for BookConfig {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "pagename",
        "title",
        "subtitle",
        "titlesort",
        "description",
        "authors",
        "series",
        "status",
        "cover",
        "coverimagename",
        "favicon",
        "faviconimagename",
        "languagecode",
        "copyright",
        "identifiers",
        "ids",
        "tags",
        "published",
        "date",
        "publishedend",
        "modified",
        "lastmod",
        "generate",
    ];
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("pagename", "id"),
        ("coverimagename", "cover"),
        ("faviconimagename", "favicon"),
        ("ids", "identifiers"),
        ("date", "published"),
        ("lastmod", "modified"),
    ];
}

/// Chapter-level settings from a Markdown front-matter block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterFrontMatter {
    pub title: Option<String>,
    pub subtitle: String,
    pub description: String,
    pub order: i64,
    pub authors: Vec<Author>,
    #[serde(rename = "languagecode")]
    pub language_code: String,
    pub copyright: String,
    pub published: Option<DateInput>,
    pub modified: Option<DateInput>,
}

impl KnownFields for ChapterFrontMatter {
    const FIELDS: &'static [&'static str] = &[
        "title",
        "subtitle",
        "description",
        "order",
        "authors",
        "languagecode",
        "copyright",
        "published",
        "date",
        "modified",
        "lastmod",
    ];
    const ALIASES: &'static [(&'static str, &'static str)] =
        &[("date", "published"), ("lastmod", "modified")];
}

/// A typed record plus the keys it did not recognize.
#[derive(Debug, Clone)]
pub struct Projected<T> {
    pub fields: T,
    pub params: Params,
}

// =============================================================================
// Loading
// =============================================================================

/// Find `<stem>.yml`, `<stem>.yaml` or `<stem>.toml` in `dir`.
pub fn find_config(dir: &Path, stem: &str) -> Option<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

/// Parse a YAML or TOML config file into a bag.
///
/// The format is picked from the extension; anything other than `.toml`
/// is read as YAML. An empty YAML document yields an empty bag.
pub fn load_bag(path: &Path) -> Result<Bag, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let value = if is_toml {
        let table: toml::Table = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        toml_to_json(toml::Value::Table(table))
    } else {
        parse_yaml(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    into_bag(value).ok_or_else(|| ConfigError::NotAMapping {
        path: path.to_path_buf(),
    })
}

/// Parse a YAML document (a config file or a front-matter block) as JSON.
pub fn parse_yaml(content: &str) -> Result<Value, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Bag::new()));
    }
    serde_yaml::from_str(content)
}

/// Unwrap a top-level object. `null` (an empty document) counts as empty.
pub fn into_bag(value: Value) -> Option<Bag> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => Some(Bag::new()),
        _ => None,
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Normalize a key for matching: lowercase, `_` and `-` removed.
pub fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn fold_nested(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (fold_key(&k), fold_nested(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_nested).collect()),
        other => other,
    }
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely, so an
///   explicit `authors: [...]` replaces the inherited list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Split a bag into typed fields and leftover params, with `defaults`
/// (already using folded keys) underneath the recognized section.
///
/// Nothing is returned on failure; the caller never sees a half-filled
/// record.
pub fn project<T>(bag: Bag, defaults: Value) -> Result<Projected<T>, serde_json::Error>
where
    T: DeserializeOwned + KnownFields,
{
    let mut known = Bag::new();
    let mut params = Params::new();
    for (key, value) in bag {
        let folded = fold_key(&key);
        if T::FIELDS.contains(&folded.as_str()) {
            known.insert(folded, fold_nested(value));
        } else {
            params.insert(key, value);
        }
    }
    for (alias, canonical) in T::ALIASES {
        if let Some(value) = known.remove(*alias) {
            known.entry(*canonical).or_insert(value);
        }
    }
    let merged = merge_values(defaults, Value::Object(known));
    let fields = serde_json::from_value(merged)?;
    Ok(Projected { fields, params })
}

/// Stock defaults for the collection record.
pub fn collection_defaults() -> Value {
    serde_json::json!({
        "languagecode": "en",
        "generate": GenerateSettings::default(),
    })
}

/// Defaults a book inherits from its collection.
pub fn book_defaults(language_code: &str, generate: GenerateSettings) -> Value {
    serde_json::json!({
        "languagecode": language_code,
        "generate": generate,
    })
}

/// Defaults a chapter inherits from its book.
pub fn chapter_defaults(language_code: &str, authors: &[Author], copyright: &str) -> Value {
    serde_json::json!({
        "languagecode": language_code,
        "authors": authors,
        "copyright": copyright,
    })
}

/// Load and project the node config `<stem>.*` from `dir`.
///
/// A missing file is an error: every collection and every book must have one.
pub fn load_node_config<T>(
    dir: &Path,
    stem: &'static str,
    defaults: Value,
) -> Result<(PathBuf, Projected<T>), ConfigError>
where
    T: DeserializeOwned + KnownFields,
{
    let path = find_config(dir, stem).ok_or_else(|| ConfigError::Missing {
        dir: dir.to_path_buf(),
        stem,
    })?;
    let bag = load_bag(&path)?;
    let projected = project(bag, defaults).map_err(|source| ConfigError::Shape {
        path: path.clone(),
        source,
    })?;
    Ok((path, projected))
}

/// Resolve the effective worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (can constrain down, not up)
pub fn effective_threads(jobs: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    jobs.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

/// Which stock config `gen-config` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Collection,
    Book,
}

/// Returns a fully-commented stock config with every recognized key.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml(kind: ConfigKind) -> &'static str {
    match kind {
        ConfigKind::Collection => STOCK_COLLECTION_TOML,
        ConfigKind::Book => STOCK_BOOK_TOML,
    }
}

const STOCK_COLLECTION_TOML: &str = r##"# bookgen.toml: collection configuration
# =======================================
# Lives at the content root, next to the books/ directory.
# The same keys work in bookgen.yml / bookgen.yaml.
# Key matching ignores case, '_' and '-': base_url, baseURL and base-url
# are all the same key. Keys not listed here are kept and exposed to
# templates as {{collection.params.<key>}}.

# Required. Shown as the site title.
title = "My Writing"

description = "Collection of my written works."

# Absolute URL the site is served from. Used for RSS links and book URLs.
base_url = "https://example.com/"

# Required. Inherited by every book and chapter that does not set one.
language_code = "en"

# Image file relative to this directory, copied to the output root.
# favicon = "favicon.png"

copyright = ""

# Extra artifacts per book. Each book may override these.
[generate]
epub = true
rss = true
"##;

const STOCK_BOOK_TOML: &str = r##"# bookgen-book.toml: book configuration
# =====================================
# Lives in books/<id>/, next to index.md (the blurb) and chapters/.
# The book id is the directory name. Setting `id` here is allowed but it
# must match the directory name.

# Required.
title = "Moonlight"
subtitle = ""
title_sort = ""
description = ""

# One of: completed | hiatus | inactive | ongoing (case-insensitive).
status = "ongoing"

# Image files relative to this directory, copied next to the book index.
# cover = "cover.jpg"
# favicon = "favicon.png"

# Inherited from the collection when omitted.
# language_code = "en"

copyright = ""
identifiers = []
tags = []

# Derived from the chapters when omitted. Accepts YYYY, YYYY-MM,
# YYYY-MM-DD, or a date with time and optional offset.
# published = 2024-01-01
# published_end = 2024-06-30
# modified = 2024-07-01

[[authors]]
name = "Jane Doe"
about = ""

[[authors.links]]
name = "Website"
address = "https://example.com/"

# [series]
# name = "The Night Cycle"
# number = 1

# Overrides the collection's [generate] table.
# [generate]
# epub = true
# rss = true
"##;
