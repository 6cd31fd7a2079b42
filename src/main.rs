use bookgen::config::{self, ConfigKind};
use bookgen::output;
use bookgen::pipeline::{self, BuildError, BuildOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "bookgen")]
#[command(about = "Static site generator for serialized fiction")]
#[command(long_about = "\
Static site generator for serialized fiction

A collection holds books, a book holds chapters. Each chapter is a markdown
file; each book becomes an HTML table of contents, one page per chapter, an
RSS feed and an EPUB.

Content structure:

  my-writing/
  ├── bookgen.yml                  # Collection config (title, baseURL, ...)
  ├── layouts/                     # Optional template overrides + static assets
  │   ├── index.html               # Collection page
  │   ├── _book.html               # Book page
  │   ├── _chapter.html            # Chapter page
  │   └── _template_footer.html    # Partial: {{> _template_footer}}
  └── books/
      └── moonlight/               # Book id = directory name
          ├── bookgen-book.yml     # Book config (title, status, authors, ...)
          ├── index.md             # Blurb
          └── chapters/
              ├── arrival.md       # Front matter: title, order, date, ...
              └── departure.md

Chapters are ordered by `order`, then publish date, then title.

Run 'bookgen gen-config' (or 'gen-config --book') for a documented config.")]
#[command(version = version_string())]
struct Cli {
    /// Content root
    #[arg(short = 'i', long, default_value = ".", global = true)]
    input_directory: PathBuf,

    /// Output directory [default: <input>/out]
    #[arg(short = 'o', long, global = true)]
    output_directory: Option<PathBuf>,

    /// Template overrides and static assets [default: <input>/layouts]
    #[arg(long, global = true)]
    layouts_directory: Option<PathBuf>,

    /// Minify HTML, CSS, JS and SVG output
    #[arg(long, global = true)]
    minify: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Worker threads, capped at the number of CPU cores [default: all cores]
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Decode, validate and render the collection (default)
    Build,
    /// Decode and validate without writing anything
    Check,
    /// Print a stock config with all options documented
    GenConfig {
        /// Print the per-book config instead of the collection config
        #[arg(long)]
        book: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or warn with --quiet
    let default_level = if cli.quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("bookgen error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), BuildError> {
    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            init_thread_pool(cli.jobs);
            let options = BuildOptions {
                input_dir: cli.input_directory,
                output_dir: cli.output_directory,
                layouts_dir: cli.layouts_directory,
                minify: cli.minify,
            };
            let report = pipeline::build(&options)?;
            if !cli.quiet {
                output::print_build_output(&report);
            }
        }
        Command::Check => {
            init_thread_pool(cli.jobs);
            let collection = pipeline::check(&cli.input_directory)?;
            if !cli.quiet {
                output::print_check_output(&collection);
            }
        }
        Command::GenConfig { book } => {
            let kind = if book {
                ConfigKind::Book
            } else {
                ConfigKind::Collection
            };
            print!("{}", config::stock_config_toml(kind));
        }
    }
    Ok(())
}

/// Initialize the global rayon pool.
///
/// Caps at the number of available CPU cores: `--jobs` can constrain down,
/// not up.
fn init_thread_pool(jobs: Option<usize>) {
    let threads = config::effective_threads(jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
