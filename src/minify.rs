//! Output minification keyed by MIME type.
//!
//! A [`Minifier`] maps a MIME type to a byte-stream transform. It is built
//! once per build (only when `--minify` is given) and passed by reference to
//! the renderer, which runs it on each rendered page and on static assets
//! whose extension maps to a registered type. It never sees the document
//! graph, only finished bytes.
//!
//! | MIME type | Backend |
//! |-----------|---------|
//! | `text/html` | minify-html, with inline CSS/JS minified |
//! | `image/svg+xml` | minify-html |
//! | `text/css` | minifier |
//! | `text/javascript` | minifier |

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const HTML: &str = "text/html";
pub const CSS: &str = "text/css";
pub const JS: &str = "text/javascript";
pub const SVG: &str = "image/svg+xml";

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("no minifier registered for `{0}`")]
    Unsupported(String),
    #[error("{mime} input is not valid UTF-8: {source}")]
    Utf8 {
        mime: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("failed to minify CSS: {0}")]
    Css(&'static str),
}

type MinifyFn = fn(&[u8]) -> Result<Vec<u8>, MinifyError>;

/// Registry of minifiers by MIME type.
pub struct Minifier {
    handlers: BTreeMap<&'static str, MinifyFn>,
}

impl Minifier {
    /// A registry with HTML, CSS, JS and SVG minifiers.
    pub fn new() -> Self {
        let mut handlers: BTreeMap<&'static str, MinifyFn> = BTreeMap::new();
        handlers.insert(HTML, minify_markup);
        handlers.insert(SVG, minify_markup);
        handlers.insert(CSS, minify_css);
        handlers.insert(JS, minify_js);
        Self { handlers }
    }

    pub fn supports(&self, mime: &str) -> bool {
        self.handlers.contains_key(mime)
    }

    /// Minify `input` as `mime`.
    pub fn minify(&self, mime: &str, input: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let handler = self
            .handlers
            .get(mime)
            .ok_or_else(|| MinifyError::Unsupported(mime.to_string()))?;
        handler(input)
    }
}

impl Default for Minifier {
    fn default() -> Self {
        Self::new()
    }
}

/// MIME type for a static asset, from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => Some(HTML),
        "css" => Some(CSS),
        "js" | "mjs" => Some(JS),
        "svg" => Some(SVG),
        _ => None,
    }
}

fn minify_markup(input: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let cfg = minify_html::Cfg {
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        minify_css: true,
        minify_js: true,
        ..minify_html::Cfg::default()
    };
    Ok(minify_html::minify(input, &cfg))
}

fn minify_css(input: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let source = std::str::from_utf8(input).map_err(|source| MinifyError::Utf8 { mime: CSS, source })?;
    let minified = minifier::css::minify(source).map_err(MinifyError::Css)?;
    Ok(minified.to_string().into_bytes())
}

fn minify_js(input: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let source = std::str::from_utf8(input).map_err(|source| MinifyError::Utf8 { mime: JS, source })?;
    Ok(minifier::js::minify(source).to_string().into_bytes())
}
