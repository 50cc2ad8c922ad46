use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sitepack::content::BlobRegistry;
use sitepack::export::{DirSink, PackageSink, ZipSink};
use sitepack::{util, Config, DocumentSet};

/// Build old/new diff packages from site content snapshots
#[derive(Debug, Parser)]
#[command(name = "sitepack", version, about)]
struct Cli {
    /// Log to stderr instead of the log file
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Data directory (defaults to ~/.sitepack)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export the initial snapshot and the changes made since
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Directory of JSON documents as they were when editing started
    #[arg(long)]
    initial: PathBuf,

    /// Directory of JSON documents as they are now
    #[arg(long)]
    current: PathBuf,

    /// Output; a path ending in .zip is written as an archive, anything else as a directory
    #[arg(long)]
    out: PathBuf,

    /// Directory holding the built site, for site-relative asset URLs
    #[arg(long)]
    static_root: Option<PathBuf>,

    /// Site origin for relative asset URLs not found locally
    #[arg(long)]
    base_url: Option<String>,

    /// Config file (defaults to ~/.sitepack/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Assets fetched at once
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir.clone());
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Export(args) => export(args).await,
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    // Log to file (~/.sitepack/logs/sitepack.log)
    fs::create_dir_all(util::logs_dir())?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

async fn export(args: ExportArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(dir) = args.static_root {
        config = config.with_static_root(dir);
    }
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }

    let initial = DocumentSet::load_dir(&args.initial)
        .with_context(|| format!("loading initial snapshot from {}", args.initial.display()))?;
    let current = DocumentSet::load_dir(&args.current)
        .with_context(|| format!("loading current documents from {}", args.current.display()))?;

    let exporter = config.exporter(BlobRegistry::new())?;
    let package = exporter
        .export_package(&initial, &current, &config.content_types)
        .await?;

    let mut sink = open_sink(&args.out)?;
    package
        .write_to(sink.as_mut())
        .with_context(|| format!("writing package to {}", args.out.display()))?;

    println!("Wrote {}", args.out.display());
    println!(
        "  old: {} documents, {} assets",
        package.old.documents.len(),
        package.old.assets.len()
    );
    println!(
        "  new: {} documents, {} new assets",
        package.new.documents.len(),
        package.new.assets.len()
    );
    if !package.changed_documents.is_empty() {
        println!("  changed: {}", package.changed_documents.join(", "));
    }
    if !package.issues.is_empty() {
        println!("{} issue(s):", package.issues.len());
        for issue in &package.issues {
            println!("  {issue}");
        }
    }
    Ok(())
}

fn open_sink(out: &Path) -> Result<Box<dyn PackageSink>> {
    let is_zip = out
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip {
        Ok(Box::new(ZipSink::create(out)?))
    } else {
        fs::create_dir_all(out)?;
        Ok(Box::new(DirSink::new(out)))
    }
}
