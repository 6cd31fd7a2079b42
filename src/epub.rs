//! EPUB writer.
//!
//! [`EpubBuilder`] collects book metadata, images and XHTML sections, then
//! writes an EPUB 3 package (with an NCX table of contents for EPUB 2
//! readers) into a zip container.
//!
//! Output is a pure function of the builder's inputs: no wall clock is read,
//! zip entries carry the fixed DOS epoch as their timestamp, and the default
//! identifier is a SHA-256 digest. Rebuilding unchanged content yields a
//! byte-identical file.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum EpubError {
    #[error("failed to write EPUB: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write EPUB container: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("duplicate EPUB resource `{0}`")]
    DuplicateResource(String),
}

const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Deterministic `urn:sha256:` identifier for a book.
pub fn identifier_for(seed: &str) -> String {
    format!("urn:sha256:{:x}", Sha256::digest(seed.as_bytes()))
}

struct Image {
    href: String,
    media_type: &'static str,
    data: Vec<u8>,
    cover: bool,
}

struct Section {
    title: String,
    body: String,
}

/// Accumulates the parts of one EPUB file.
pub struct EpubBuilder {
    title: String,
    title_sort: Option<String>,
    authors: Vec<String>,
    language: String,
    identifier: Option<String>,
    description: Option<String>,
    rights: Option<String>,
    series: Option<(String, f32)>,
    published: Option<DateTime<FixedOffset>>,
    modified: Option<DateTime<FixedOffset>>,
    stylesheet: Option<String>,
    images: Vec<Image>,
    sections: Vec<Section>,
}

impl EpubBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            title_sort: None,
            authors: Vec::new(),
            language: "en".to_string(),
            identifier: None,
            description: None,
            rights: None,
            series: None,
            published: None,
            modified: None,
            stylesheet: None,
            images: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn set_title_sort(&mut self, title_sort: impl Into<String>) -> &mut Self {
        self.title_sort = Some(title_sort.into());
        self
    }

    pub fn set_author(&mut self, name: impl Into<String>) -> &mut Self {
        self.authors.push(name.into());
        self
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.language = language.into();
        self
    }

    /// Overrides the digest of the title used when none is set.
    pub fn set_identifier(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_rights(&mut self, rights: impl Into<String>) -> &mut Self {
        self.rights = Some(rights.into());
        self
    }

    pub fn set_series(&mut self, name: impl Into<String>, number: f32) -> &mut Self {
        self.series = Some((name.into(), number));
        self
    }

    pub fn set_published(&mut self, date: DateTime<FixedOffset>) -> &mut Self {
        self.published = Some(date);
        self
    }

    /// `dcterms:modified`. Falls back to the publish date, then the Unix epoch.
    pub fn set_modified(&mut self, date: DateTime<FixedOffset>) -> &mut Self {
        self.modified = Some(date);
        self
    }

    pub fn set_stylesheet(&mut self, css: impl Into<String>) -> &mut Self {
        self.stylesheet = Some(css.into());
        self
    }

    /// Add an image under `OEBPS/images/<file_name>`.
    ///
    /// Returns the href to use from a section body.
    pub fn add_image(&mut self, file_name: &str, data: Vec<u8>) -> Result<String, EpubError> {
        self.push_image(file_name, data, false)
    }

    /// Add the cover image. It is marked `cover-image` in the manifest and
    /// gets its own page at the front of the spine.
    pub fn set_cover(&mut self, file_name: &str, data: Vec<u8>) -> Result<String, EpubError> {
        self.images.iter_mut().for_each(|i| i.cover = false);
        self.push_image(file_name, data, true)
    }

    fn push_image(&mut self, file_name: &str, data: Vec<u8>, cover: bool) -> Result<String, EpubError> {
        let name = sanitize_path(file_name);
        let href = format!("images/{name}");
        if self.images.iter().any(|i| i.href == href) {
            return Err(EpubError::DuplicateResource(href));
        }
        self.images.push(Image {
            media_type: media_type(&name),
            href: href.clone(),
            data,
            cover,
        });
        Ok(href)
    }

    /// Append a spine section. `body` is an XHTML fragment placed inside
    /// `<body>`; `title` becomes its table-of-contents label.
    pub fn add_section(&mut self, title: impl Into<String>, body: impl Into<String>) -> &mut Self {
        self.sections.push(Section {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    pub fn write(&self, path: &Path) -> Result<(), EpubError> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<(), EpubError> {
        let mut zip = ZipWriter::new(writer);
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default());
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // mimetype first and uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        let identifier = self.identifier();
        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(self.opf(&identifier).as_bytes())?;
        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(self.ncx(&identifier).as_bytes())?;
        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(self.nav().as_bytes())?;

        if let Some(css) = &self.stylesheet {
            zip.start_file("OEBPS/style.css", deflated)?;
            zip.write_all(css.as_bytes())?;
        }
        if let Some(cover) = self.cover() {
            zip.start_file("OEBPS/cover.xhtml", deflated)?;
            let body = format!(
                "<div class=\"cover\"><img src=\"{}\" alt=\"{}\"/></div>",
                escape_xml(&cover.href),
                escape_xml(&self.title)
            );
            zip.write_all(self.document(&self.title, &body).as_bytes())?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            zip.start_file(format!("OEBPS/{}", section_href(i)), deflated)?;
            zip.write_all(self.document(&section.title, &section.body).as_bytes())?;
        }
        for image in &self.images {
            zip.start_file(format!("OEBPS/{}", image.href), deflated)?;
            zip.write_all(&image.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn identifier(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| identifier_for(&self.title))
    }

    fn cover(&self) -> Option<&Image> {
        self.images.iter().find(|i| i.cover)
    }

    fn modified(&self) -> String {
        self.modified
            .or(self.published)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn opf(&self, identifier: &str) -> String {
        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
        );
        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape_xml(identifier)
        ));
        opf.push_str(&format!(
            "    <dc:title id=\"title\">{}</dc:title>\n",
            escape_xml(&self.title)
        ));
        if let Some(sort) = &self.title_sort {
            opf.push_str(&format!(
                "    <meta refines=\"#title\" property=\"file-as\">{}</meta>\n",
                escape_xml(sort)
            ));
        }
        for (i, author) in self.authors.iter().enumerate() {
            opf.push_str(&format!(
                "    <dc:creator id=\"creator{}\">{}</dc:creator>\n",
                i + 1,
                escape_xml(author)
            ));
        }
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape_xml(&self.language)
        ));
        if let Some(description) = &self.description {
            opf.push_str(&format!(
                "    <dc:description>{}</dc:description>\n",
                escape_xml(description)
            ));
        }
        if let Some(rights) = &self.rights {
            opf.push_str(&format!("    <dc:rights>{}</dc:rights>\n", escape_xml(rights)));
        }
        if let Some(date) = self.published {
            opf.push_str(&format!(
                "    <dc:date>{}</dc:date>\n",
                date.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            self.modified()
        ));
        if let Some((name, number)) = &self.series {
            opf.push_str(&format!(
                "    <meta property=\"belongs-to-collection\" id=\"series\">{}</meta>\n",
                escape_xml(name)
            ));
            opf.push_str("    <meta refines=\"#series\" property=\"collection-type\">series</meta>\n");
            opf.push_str(&format!(
                "    <meta refines=\"#series\" property=\"group-position\">{number}</meta>\n"
            ));
        }
        if self.cover().is_some() {
            // EPUB 2 readers look for this
            opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
        }
        opf.push_str("  </metadata>\n  <manifest>\n");

        opf.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        opf.push_str("    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
        if self.stylesheet.is_some() {
            opf.push_str("    <item id=\"css\" href=\"style.css\" media-type=\"text/css\"/>\n");
        }
        if self.cover().is_some() {
            opf.push_str(
                "    <item id=\"cover\" href=\"cover.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            );
        }
        for i in 0..self.sections.len() {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                section_id(i),
                section_href(i)
            ));
        }
        for (i, image) in self.images.iter().enumerate() {
            let (id, properties) = if image.cover {
                ("cover-image".to_string(), " properties=\"cover-image\"")
            } else {
                (format!("image{}", i + 1), "")
            };
            opf.push_str(&format!(
                "    <item id=\"{id}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
                escape_xml(&image.href),
                image.media_type
            ));
        }
        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        if self.cover().is_some() {
            opf.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
        }
        for i in 0..self.sections.len() {
            opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", section_id(i)));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }

    fn ncx(&self, identifier: &str) -> String {
        let mut ncx = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
"#,
            escape_xml(identifier),
            escape_xml(&self.title)
        );
        for (i, section) in self.sections.iter().enumerate() {
            let order = i + 1;
            ncx.push_str(&format!(
                "    <navPoint id=\"navPoint-{order}\" playOrder=\"{order}\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
                escape_xml(&section.title),
                section_href(i)
            ));
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    fn nav(&self) -> String {
        let mut items = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            items.push_str(&format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                section_href(i),
                escape_xml(&section.title)
            ));
        }
        let body = format!(
            "<nav epub:type=\"toc\" id=\"toc\">\n    <h1>{}</h1>\n    <ol>\n{items}    </ol>\n  </nav>",
            escape_xml(&self.title)
        );
        self.document(&self.title, &body)
    }

    fn document(&self, title: &str, body: &str) -> String {
        let stylesheet = if self.stylesheet.is_some() {
            "\n    <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\"/>"
        } else {
            ""
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
  <head>
    <meta charset="UTF-8"/>
    <title>{title}</title>{stylesheet}
  </head>
  <body>
  {body}
  </body>
</html>
"#,
            lang = escape_xml(&self.language),
            title = escape_xml(title),
        )
    }
}

fn section_id(index: usize) -> String {
    format!("section{:03}", index + 1)
}

fn section_href(index: usize) -> String {
    format!("{}.xhtml", section_id(index))
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn sanitize_path(path: &str) -> String {
    path.trim_start_matches('/')
        .replace('\\', "/")
        .replace("//", "/")
}

fn media_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
