use clap::{Parser, Subcommand};
use env_logger::Env;
use forum_ssg::generate::{self, BuildMode};
use forum_ssg::{config, output, snapshot};
use log::error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forum-ssg")]
#[command(about = "Static site generator for forum-style collections of posts")]
#[command(long_about = "\
Static site generator for forum-style collections of posts

Each collection (subforum) is a JSON definition naming a template and its
data sources. Posts are merged with per-title metadata, indexed by tag and
developer, and rendered into paginated listings, post pages and RSS feeds.

Project structure:

  site/
  ├── config.toml                  # Site config (optional)
  ├── partials/
  │   ├── base.html                # Page skeleton (required)
  │   ├── head.html                # <head> with {{title}}, {{description}}, ...
  │   ├── header.html, footer.html
  │   └── index.html, 404.html     # Written verbatim on full builds
  ├── subforums/
  │   ├── games.json               # Collection definition
  │   ├── games/data.json          # Local data source
  │   └── vn.json                  # May point at http(s) sources
  └── mtime.json                   # Change snapshot for --incremental

Run 'forum-ssg gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root containing config.toml, partials and collections
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the site into the output directory
    Build {
        /// Only re-render collections whose files changed since the last build
        #[arg(long)]
        incremental: bool,
    },
    /// Render everything in memory and report problems without writing
    Check,
    /// Record current collection file times without building
    Snapshot,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Build { incremental } => {
            let config = config::load_config(&cli.root)?;
            init_thread_pool(&config.processing);
            let mode = if *incremental {
                BuildMode::Incremental
            } else {
                BuildMode::Full
            };
            let report = generate::build_site(&cli.root, &config, mode)?;
            output::print_build_report(&report);
        }
        Command::Check => {
            let config = config::load_config(&cli.root)?;
            init_thread_pool(&config.processing);
            let (report, _) = generate::check_site(&cli.root, &config)?;
            output::print_check_report(&report);
        }
        Command::Snapshot => {
            let config = config::load_config(&cli.root)?;
            let paths = config.paths.resolve(&cli.root);
            let previous = snapshot::ChangeSnapshot::load(&paths.snapshot);
            let mut changes = snapshot::changed_sources(&paths.collections, &previous)?;
            changes.current.links = previous.links;
            changes.current.save(&paths.snapshot)?;
            output::print_snapshot(&changes);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
