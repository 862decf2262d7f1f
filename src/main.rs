use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use license_crawl::config::{CrawlConfig, log_path};
use license_crawl::crawl::crawl;
use license_crawl::logging::init_logging;
use license_crawl::metadata::registries::NpmRegistry;

#[derive(Parser)]
#[command(name = "license-crawl")]
#[command(
    version,
    about = "Report the license of every package in a dependency graph"
)]
struct Cli {
    /// Root package name
    package: String,

    /// Version range of the root package
    #[arg(default_value = "latest")]
    range: String,

    /// Registry base URL
    #[arg(long)]
    registry: Option<String>,

    /// Per-fetch timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum number of registry requests in flight
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Write JSON logs to the data directory instead of stderr
    #[arg(long)]
    log_file: bool,

    /// Print the report on a single line
    #[arg(long)]
    compact: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CrawlConfig) {
        if let Some(url) = &self.registry {
            config.registry.url = url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.fetch.timeout_ms = timeout_ms;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.fetch.max_concurrent = max_concurrent;
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CrawlConfig::discover(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let registry = Arc::new(NpmRegistry::new(&config.registry.url)?);
    info!(
        "Crawling {}@{} against {}",
        cli.package, cli.range, config.registry.url
    );

    let report = crawl(registry, &config, &cli.package, &cli.range).await?;

    let failures = report.failure_count();
    if failures > 0 {
        warn!("{} package version(s) could not be fetched", failures);
    }

    let output = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", output);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.then(log_path);
    let _guard = init_logging(&cli.log_level, log_file.as_deref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
