//! `sqlar`: create, list and extract SQLite Archive files.
//!
//! Usage:
//!   sqlar site.sqlar public/ 'docs/**/*.md'    # archive
//!   sqlar -l site.sqlar '*.html'               # list
//!   sqlar -x site.sqlar                        # extract into the cwd

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use terminal_size::{Width, terminal_size};
use tracing_subscriber::{EnvFilter, fmt};

use sqlarfs::SqliteStore;
use sqlarfs::archive::{self, format_entry};

/// Create, list and extract SQLite Archive (sqlar) files.
#[derive(Parser, Debug)]
#[command(name = "sqlar", version)]
struct Args {
    /// List archive members matching FILES
    #[arg(short = 'l', conflicts_with = "extract")]
    list: bool,

    /// Extract archive members matching FILES into the current directory
    #[arg(short = 'x')]
    extract: bool,

    /// Output width (defaults to the terminal width)
    #[arg(short = 'w')]
    width: Option<usize>,

    /// Archive file
    archive: PathBuf,

    /// Paths or glob patterns
    files: Vec<String>,
}

fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => w as usize,
        None => 80,
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let width = args.width.unwrap_or_else(terminal_width);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failed_print = None;
    let mut print = |info: &sqlarfs::PathInfo| {
        if failed_print.is_none() {
            if let Err(e) = writeln!(out, "{}", format_entry(info, width)) {
                failed_print = Some(e);
            }
        }
    };

    if args.list || args.extract {
        if !args.archive.exists() {
            bail!("archive not found: {}", args.archive.display());
        }
        let store = SqliteStore::open_read_only(&args.archive)
            .with_context(|| format!("opening {}", args.archive.display()))?;
        if args.list {
            archive::list(&store, &args.files, &mut print).context("listing archive")?;
        } else {
            let dest = std::env::current_dir().context("resolving current directory")?;
            archive::extract(&store, &args.files, &dest, &mut print)
                .context("extracting archive")?;
        }
    } else {
        if args.files.is_empty() {
            Args::command()
                .error(ErrorKind::MissingRequiredArgument, "No filenames provided.")
                .exit();
        }
        let store = SqliteStore::open(&args.archive)
            .with_context(|| format!("opening {}", args.archive.display()))?;
        archive::archive(&store, &args.files, &mut print).context("archiving files")?;
    }

    if let Some(e) = failed_print {
        return Err(e).context("writing listing");
    }
    Ok(())
}
