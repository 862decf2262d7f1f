//! Dependency graph crawl and license aggregation
//!
//! Starting from a root package, every declared dependency is fetched once per
//! distinct version token. When no package is left pending, the declared
//! license of every fetched version is collected into a [`LicenseReport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ CrawlCache  │────▶│ PackageEntry │────▶│ VersionRecord │
//! │ (pending /  │     │ (per name)   │     │ (per version) │
//! │  resolved)  │     └──────────────┘     └───────┬───────┘
//! └──────┬──────┘                                  │ spawn
//!        │ completions                             ▼
//!        │◀───────────────────────────────── ┌───────────┐
//!        ▼                                   │  Fetcher  │──▶ Registry
//! ┌─────────────┐                            └───────────┘
//! │LicenseReport│
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: Crawl state and termination detection
//! - [`entry`]: All versions known for one package name
//! - [`record`]: One fetch of one package version
//! - [`fetcher`]: Registry access with timeout and concurrency limit
//! - [`report`]: The aggregated license report
//! - [`error`]: Crawl errors

pub mod cache;
pub mod entry;
pub mod error;
pub mod fetcher;
pub mod record;
pub mod report;

use std::sync::Arc;

use crate::config::CrawlConfig;
use crate::crawl::cache::CrawlCache;
use crate::crawl::error::CrawlError;
use crate::crawl::fetcher::Fetcher;
use crate::crawl::report::LicenseReport;
use crate::metadata::range::NaiveRangeNormalizer;
use crate::metadata::registry::Registry;

/// Crawl the dependency graph of `name` at `range` and return its license report.
pub async fn crawl(
    registry: Arc<dyn Registry>,
    config: &CrawlConfig,
    name: &str,
    range: &str,
) -> Result<LicenseReport, CrawlError> {
    let mut cache = CrawlCache::new(
        Fetcher::from_config(registry, config),
        Box::new(NaiveRangeNormalizer::new()),
    );
    cache.request_package(name, range);
    cache.run().await
}
