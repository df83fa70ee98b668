use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};

use depbump::config::{self, Config, Overrides};
use depbump::resolve::{BatchOptions, DependencyResolver};
use depbump::version::cache::Cache;
use depbump::version::fetcher::MetadataFetcher;
use depbump::version::select::RangeMode;
use depbump::workspace::render::{render_report, render_summary};
use depbump::workspace::{WorkspaceOptions, resolve_workspace};

#[derive(Parser)]
#[command(name = "depbump")]
#[command(version, about = "Check and bump npm dependency versions")]
struct Cli {
    /// Range mode used to pick targets
    #[arg(value_enum)]
    mode: Option<RangeMode>,

    /// Write updated versions back to the manifests
    #[arg(short, long)]
    write: bool,

    /// Scan package.json files in subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Only check matching packages (names, globs or /regex/)
    #[arg(short = 'n', long, value_delimiter = ',')]
    include: Vec<String>,

    /// Skip matching packages
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Also bump exact versions
    #[arg(short = 'l', long)]
    include_locked: bool,

    /// Check peerDependencies too
    #[arg(short = 'P', long)]
    peer: bool,

    /// Show up-to-date dependencies as well
    #[arg(short, long)]
    all: bool,

    /// Directory to run in
    #[arg(short = 'C', long, default_value = ".")]
    cwd: PathBuf,

    /// Bypass the metadata cache
    #[arg(long)]
    no_cache: bool,

    /// Exit with status 1 when updates are available
    #[arg(long)]
    fail_on_outdated: bool,

    /// Also write JSON logs, to the cache directory unless a path is given
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            include_locked: self.include_locked,
            recursive: self.recursive,
            write: self.write,
            peer: self.peer,
            all: self.all,
            fail_on_outdated: self.fail_on_outdated,
            no_cache: self.no_cache,
        }
    }
}

fn open_fetcher(config: &Config) -> MetadataFetcher {
    let fetcher = MetadataFetcher::new(Arc::new(config.npm_registry()));
    if !config.cache.enabled {
        return fetcher;
    }

    let data_dir = config::data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        warn!("Failed to create {}: {}", data_dir.display(), e);
        return fetcher;
    }

    match Cache::new(&config::db_path(), config.cache.ttl) {
        Ok(cache) => fetcher.with_store(Arc::new(cache)),
        Err(e) => {
            warn!("Metadata cache disabled: {}", e);
            fetcher
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(&cli.cwd)
        .context("Failed to load configuration")?
        .merge(cli.overrides());
    debug!("Using mode {}", config.mode);

    let resolver = DependencyResolver::new(
        Arc::new(open_fetcher(&config)),
        config.resolve_options()?,
    );
    let options = WorkspaceOptions {
        recursive: config.recursive,
        write: config.write,
        batch: BatchOptions {
            concurrency: config.concurrency,
            ..BatchOptions::default()
        },
        disabled_fields: config.disabled_fields(),
    };

    let reports = resolve_workspace(&resolver, &cli.cwd, &options, |path, name, done, total| {
        debug!("[{}] {}/{} {}", path.display(), done, total, name);
    })
    .await;

    if reports.is_empty() {
        anyhow::bail!("No package.json found in {}", cli.cwd.display());
    }

    print!("{}", render_report(&reports, config.all, chrono::Utc::now()));
    println!("{}", render_summary(&reports, config.write));

    let outdated = reports
        .iter()
        .any(|r| depbump::workspace::writer::pending_updates(&r.dependencies) > 0);
    if config.fail_on_outdated && outdated {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .clone()
        .map(|path| path.unwrap_or_else(config::log_path));
    let _guard = depbump::logging::init(cli.verbose, log_file.as_deref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
