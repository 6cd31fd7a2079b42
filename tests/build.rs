//! End-to-end builds of the fixture collection through the public API.
//!
//! Each test copies `fixtures/collection/` into its own temp directory,
//! optionally edits it, and runs `pipeline::build` or `pipeline::check`.

use bookgen::pipeline::{self, BuildError, BuildOptions};
use bookgen::validate::ValidationError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/collection");
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let dst = tmp.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst).unwrap();
        } else {
            fs::copy(entry.path(), &dst).unwrap();
        }
    }
    tmp
}

fn build_into(root: &Path, out: &Path) -> pipeline::BuildReport {
    let mut options = BuildOptions::new(root);
    options.output_dir = Some(out.to_path_buf());
    pipeline::build(&options).unwrap()
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

/// All `.html` files under `dir`, relative path → contents.
fn html_files(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.path().extension().is_some_and(|x| x == "html"))
        .map(|e| {
            (
                e.path().strip_prefix(dir).unwrap().to_path_buf(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[test]
fn one_page_per_chapter() {
    let tmp = fixtures();
    let out = tmp.path().join("site");
    build_into(tmp.path(), &out);

    let chapters = out.join("books/moonlight/chapters");
    let mut names: Vec<String> = fs::read_dir(&chapters)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["a-night-walk.html", "b-the-lamp.html", "c-morning.html"]);
}

#[test]
fn table_of_contents_follows_order() {
    let tmp = fixtures();
    let out = tmp.path().join("site");
    build_into(tmp.path(), &out);

    let index = read(out.join("books/moonlight/index.html"));
    let lamp = index.find("The Lamp").unwrap();
    let walk = index.find("Night Walk").unwrap();
    let morning = index.find("Morning").unwrap();
    assert!(lamp < walk && walk < morning);
}

#[test]
fn first_chapter_links_forward_only() {
    let tmp = fixtures();
    let out = tmp.path().join("site");
    build_into(tmp.path(), &out);

    let first = read(out.join("books/moonlight/chapters/b-the-lamp.html"));
    assert!(!first.contains("Previous"));
    assert!(first.contains(r#"rel="next" href="../../../books/moonlight/chapters/a-night-walk.html""#));

    let last = read(out.join("books/moonlight/chapters/c-morning.html"));
    assert!(last.contains(r#"rel="prev" href="../../../books/moonlight/chapters/a-night-walk.html""#));
    assert!(!last.contains(r#"rel="next""#));
}

#[test]
fn rebuilding_is_byte_identical() {
    let tmp = fixtures();
    let out = tmp.path().join("site");
    build_into(tmp.path(), &out);
    let first = html_files(&out);
    let first_epub = fs::read(out.join("books/moonlight/moonlight.epub")).unwrap();

    build_into(tmp.path(), &out);
    assert_eq!(first, html_files(&out));
    assert_eq!(first_epub, fs::read(out.join("books/moonlight/moonlight.epub")).unwrap());
}

#[test]
fn feeds_epubs_and_assets_are_written() {
    let tmp = fixtures();
    let out = tmp.path().join("site");
    let report = build_into(tmp.path(), &out);

    let rss = read(out.join("books/moonlight/rss.xml"));
    assert!(rss.contains("<link>https://example.com/books/moonlight/chapters/b-the-lamp.html</link>"));
    assert!(out.join("books/moonlight/moonlight.epub").is_file());
    assert!(out.join("books/tidewater/tidewater.epub").is_file());
    assert!(out.join("books/tidewater/cover.svg").is_file());
    assert!(out.join("favicon.svg").is_file());

    assert!(out.join("css/site.css").is_file());
    assert!(!out.join("_template_footer.html").exists());
    assert_eq!(report.render.assets, [PathBuf::from("css/site.css")]);
}

#[test]
fn layout_override_and_partial_are_used() {
    let tmp = fixtures();
    fs::write(
        tmp.path().join("layouts/_book.html"),
        "<h1>{{book.title}}</h1>{{#each book.chapters}}<a href=\"{{../root}}{{path}}\">{{title}}</a>{{/each}}{{> _template_footer}}",
    )
    .unwrap();
    let out = tmp.path().join("site");
    build_into(tmp.path(), &out);

    let index = read(out.join("books/moonlight/index.html"));
    assert!(index.starts_with("<h1>Moonlight</h1><a href=\"../../books/moonlight/chapters/b-the-lamp.html\">The Lamp</a>"));
    assert!(index.trim_end().ends_with("<footer>© Jane Doe</footer>"));
    assert!(!out.join("_book.html").exists());
    // other roles keep the built-in page
    assert!(read(out.join("index.html")).starts_with("<!DOCTYPE html>"));
}

#[test]
fn minify_shrinks_pages_and_assets() {
    let tmp = fixtures();
    let plain = tmp.path().join("plain");
    build_into(tmp.path(), &plain);

    let mut options = BuildOptions::new(tmp.path());
    options.output_dir = Some(tmp.path().join("min"));
    options.minify = true;
    pipeline::build(&options).unwrap();

    for file in ["index.html", "books/moonlight/index.html", "css/site.css"] {
        let a = fs::metadata(plain.join(file)).unwrap().len();
        let b = fs::metadata(tmp.path().join("min").join(file)).unwrap().len();
        assert!(b < a, "{file}: {b} >= {a}");
    }
}

#[test]
fn empty_title_fails_validation() {
    let tmp = fixtures();
    fs::write(
        tmp.path().join("books/moonlight/bookgen-book.yml"),
        "title: \"\"\nstatus: ongoing\n",
    )
    .unwrap();
    let err = pipeline::check(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Validation(ValidationError::EmptyField { field: "title", .. })
    ));
    assert!(err.to_string().contains("title"));
}

#[test]
fn unknown_status_lists_valid_values() {
    let tmp = fixtures();
    fs::write(
        tmp.path().join("books/moonlight/bookgen-book.yml"),
        "title: Moonlight\nstatus: archived\n",
    )
    .unwrap();
    let err = pipeline::check(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("completed | hiatus | inactive | ongoing"));
}

#[test]
fn missing_cover_names_the_path() {
    let tmp = fixtures();
    fs::remove_file(tmp.path().join("books/tidewater/cover.svg")).unwrap();
    let err = pipeline::check(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Validation(ValidationError::MissingAsset { field: "cover", .. })
    ));
    assert!(err.to_string().contains("cover.svg"));
}

#[test]
fn failed_validation_writes_nothing() {
    let tmp = fixtures();
    fs::remove_file(tmp.path().join("books/tidewater/cover.svg")).unwrap();
    let out = tmp.path().join("site");
    let mut options = BuildOptions::new(tmp.path());
    options.output_dir = Some(out.clone());
    assert!(pipeline::build(&options).is_err());
    assert!(!out.exists());
}

#[test]
fn output_directory_must_differ_from_input() {
    let tmp = fixtures();
    let mut options = BuildOptions::new(tmp.path());
    options.output_dir = Some(tmp.path().to_path_buf());
    let err = pipeline::build(&options).unwrap_err();
    assert!(matches!(err, BuildError::OutputOverlapsInput { .. }));
    assert!(tmp.path().join("bookgen.yml").is_file());
}
