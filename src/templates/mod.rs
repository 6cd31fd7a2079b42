//! Template resolution and execution.
//!
//! Three page roles exist, each with a fixed file name in the layout
//! directory:
//!
//! | Role | Override file | Output |
//! |------|---------------|--------|
//! | collection | `index.html` | `index.html` |
//! | book | `_book.html` | `books/<id>/index.html` |
//! | chapter | `_chapter.html` | `books/<id>/chapters/<chapter>.html` |
//!
//! An override is a Handlebars template. When a role has no override the
//! built-in Maud page from [`defaults`] is used instead; the two are never
//! mixed. Files matching `_template_*.html` are registered as partials under
//! their file stem (`{{> _template_footer}}`) and are available to every
//! override.
//!
//! Overrides render in strict mode: referencing a field that does not exist
//! in the [`context`] structs is a render error rather than an empty string.
//! A `date` helper formats the RFC 3339 dates found in the context:
//!
//! ```handlebars
//! {{date chapter.published "%d %B %Y"}}
//! ```

pub mod context;
pub mod defaults;

use chrono::DateTime;
use handlebars::{Handlebars, RenderErrorReason};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use context::{BookPage, BookView, ChapterLink, ChapterPage, CollectionPage};

/// Glob, relative to the layout directory, for partial templates.
pub const PARTIAL_PATTERN: &str = "_template_*.html";

/// Format used by the `date` helper when none is given.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse template `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error("failed to render template `{template}`: {source}")]
    Render {
        template: &'static str,
        #[source]
        source: Box<handlebars::RenderError>,
    },
    #[error("invalid partial pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list partials: {0}")]
    Glob(#[from] glob::GlobError),
}

/// A page role with its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Collection,
    Book,
    Chapter,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Collection, Role::Book, Role::Chapter];

    /// Override file name inside the layout directory, also used as the
    /// registered template name.
    pub fn file_name(self) -> &'static str {
        match self {
            Role::Collection => "index.html",
            Role::Book => "_book.html",
            Role::Chapter => "_chapter.html",
        }
    }
}

/// Resolved templates for one build.
pub struct Templates {
    registry: Handlebars<'static>,
    partials: Vec<String>,
}

impl Templates {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_helper("date", Box::new(date_helper));
        Self {
            registry,
            partials: Vec::new(),
        }
    }

    /// Load overrides and partials from `layouts_dir`.
    ///
    /// A missing directory is not an error; every role falls back to its
    /// built-in template.
    pub fn load(layouts_dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = Self::builtin();
        if !layouts_dir.is_dir() {
            debug!(dir = %layouts_dir.display(), "no layouts directory, using built-in templates");
            return Ok(templates);
        }

        for role in Role::ALL {
            let path = layouts_dir.join(role.file_name());
            if path.is_file() {
                let source = read_template(&path)?;
                templates
                    .registry
                    .register_template_string(role.file_name(), source)
                    .map_err(|e| TemplateError::Parse {
                        path: path.clone(),
                        source: Box::new(e),
                    })?;
                debug!(template = role.file_name(), "using layout override");
            }
        }

        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&layouts_dir.to_string_lossy()),
            PARTIAL_PATTERN
        );
        let mut partial_paths = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
        partial_paths.sort();
        for path in partial_paths {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let source = read_template(&path)?;
            templates
                .registry
                .register_partial(&name, source)
                .map_err(|e| TemplateError::Parse {
                    path: path.clone(),
                    source: Box::new(e),
                })?;
            debug!(partial = %name, "registered partial");
            templates.partials.push(name);
        }

        Ok(templates)
    }

    /// Whether the layout directory overrides `role`.
    pub fn is_overridden(&self, role: Role) -> bool {
        self.registry.has_template(role.file_name())
    }

    /// Names of registered partials, sorted.
    pub fn partials(&self) -> &[String] {
        &self.partials
    }

    pub fn render_collection(&self, page: &CollectionPage<'_>) -> Result<String, TemplateError> {
        self.render(Role::Collection, page, || defaults::collection_page(page).into_string())
    }

    pub fn render_book(&self, page: &BookPage<'_>) -> Result<String, TemplateError> {
        self.render(Role::Book, page, || defaults::book_page(page).into_string())
    }

    pub fn render_chapter(&self, page: &ChapterPage<'_>) -> Result<String, TemplateError> {
        self.render(Role::Chapter, page, || defaults::chapter_page(page).into_string())
    }

    fn render<T: Serialize>(
        &self,
        role: Role,
        data: &T,
        builtin: impl FnOnce() -> String,
    ) -> Result<String, TemplateError> {
        if !self.is_overridden(role) {
            return Ok(builtin());
        }
        self.registry
            .render(role.file_name(), data)
            .map_err(|e| TemplateError::Render {
                template: role.file_name(),
                source: Box::new(e),
            })
    }
}

/// Whether a layout-relative path is a template rather than a static asset.
///
/// Only files at the top of the layout directory can be templates.
pub fn is_template_file(relative: &Path) -> bool {
    let mut components = relative.components();
    let (Some(Component::Normal(name)), None) = (components.next(), components.next()) else {
        return false;
    };
    let name = name.to_string_lossy();
    Role::ALL.iter().any(|r| r.file_name() == name)
        || glob::Pattern::new(PARTIAL_PATTERN).is_ok_and(|p| p.matches(&name))
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// Handlebars helpers

fn date_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    if value.is_empty() {
        return Ok(());
    }
    let format = h
        .param(1)
        .and_then(|v| v.value().as_str())
        .unwrap_or(DEFAULT_DATE_FORMAT);
    let date = DateTime::parse_from_rfc3339(value)
        .map_err(|e| RenderErrorReason::Other(format!("date: cannot parse {value:?}: {e}")))?;
    let mut formatted = String::new();
    write!(formatted, "{}", date.format(format))
        .map_err(|_| RenderErrorReason::Other(format!("date: invalid format {format:?}")))?;
    out.write(&formatted)?;
    Ok(())
}
