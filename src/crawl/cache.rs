//! Crawl state: which packages are pending, which are resolved, and when the
//! whole dependency graph has settled.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::FuturesUnordered;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::crawl::entry::PackageEntry;
use crate::crawl::error::CrawlError;
use crate::crawl::fetcher::Fetcher;
use crate::crawl::record::Settlement;
use crate::crawl::report::LicenseReport;
use crate::metadata::range::RangeNormalizer;

/// Where a package currently sits in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// At least one version is still being fetched or awaiting expansion
    Pending,
    /// Every known version has settled and been expanded
    Resolved,
}

struct TrackedEntry {
    entry: PackageEntry,
    status: EntryStatus,
    /// Completions subscribed for this entry whose handler has not run yet
    awaiting: usize,
}

type PendingCompletion = BoxFuture<'static, (String, Settlement)>;

/// Drives one crawl from a root package to a license report.
///
/// The cache is owned by a single task. Fetches run on spawned tasks, but
/// their results only reach the cache through `completions`, so the entry map
/// is mutated between awaits only and needs no lock.
pub struct CrawlCache {
    fetcher: Fetcher,
    normalizer: Box<dyn RangeNormalizer>,
    entries: HashMap<String, TrackedEntry>,
    completions: FuturesUnordered<PendingCompletion>,
    report: Option<LicenseReport>,
    report_emitted: bool,
}

impl CrawlCache {
    pub fn new(fetcher: Fetcher, normalizer: Box<dyn RangeNormalizer>) -> Self {
        Self {
            fetcher,
            normalizer,
            entries: HashMap::new(),
            completions: FuturesUnordered::new(),
            report: None,
            report_emitted: false,
        }
    }

    /// Make sure the version of `name` selected by `range` is fetched and its
    /// dependencies crawled.
    ///
    /// # Panics
    ///
    /// Starting a fetch spawns a task, so this panics when called outside a
    /// tokio runtime.
    pub fn request_package(&mut self, name: &str, range: &str) {
        let version = self.normalizer.normalize(range);

        if self.contains_version(name, &version) {
            debug!("Dependency {}@{} has already been acquired", name, version);
            self.check_for_tree_resolution();
            return;
        }

        let tracked = match self.entries.entry(name.to_string()) {
            Entry::Occupied(occupied) => {
                let tracked = occupied.into_mut();
                if tracked.status == EntryStatus::Resolved {
                    debug!(
                        "New version {} of resolved package {}, back to pending",
                        version, name
                    );
                    tracked.status = EntryStatus::Pending;
                }
                tracked
            }
            Entry::Vacant(vacant) => vacant.insert(TrackedEntry {
                entry: PackageEntry::new(name),
                status: EntryStatus::Pending,
                awaiting: 0,
            }),
        };

        info!("Fetching: {}@{}", name, version);
        let completion = tracked.entry.ensure_version_fetched(&version, &self.fetcher);
        tracked.awaiting += 1;

        let name = name.to_string();
        self.completions.push(
            async move {
                // The sender only disappears if the record itself is gone.
                let settlement = completion.await.unwrap_or(Settlement::Failed);
                (name, settlement)
            }
            .boxed(),
        );
    }

    /// Wait for the next settled fetch and run its completion handler.
    ///
    /// Returns false when nothing is left to wait for.
    pub async fn process_next_completion(&mut self) -> bool {
        match self.completions.next().await {
            Some((name, settlement)) => {
                self.on_settled(&name, settlement);
                true
            }
            None => false,
        }
    }

    /// Run the crawl until no fetch is outstanding and hand out the report.
    pub async fn run(&mut self) -> Result<LicenseReport, CrawlError> {
        while self.process_next_completion().await {}

        match self.report.take() {
            Some(report) => Ok(report),
            None if self.report_emitted => Err(CrawlError::AlreadyReported),
            None => Err(CrawlError::Stalled {
                pending: self.pending_packages().len(),
            }),
        }
    }

    fn on_settled(&mut self, name: &str, settlement: Settlement) {
        if let Settlement::Fetched {
            name: fetched_name,
            version,
            metadata,
        } = settlement
        {
            debug!("Now looking for dependencies of {}@{}", fetched_name, version);
            self.fetch_dependencies(&fetched_name, &version, &metadata.dependencies);
        }

        let Some(tracked) = self.entries.get_mut(name) else {
            return;
        };
        tracked.awaiting = tracked.awaiting.saturating_sub(1);

        if tracked.awaiting == 0 && tracked.entry.is_fully_settled() {
            if tracked.status == EntryStatus::Pending {
                debug!("Package {} resolved", name);
                tracked.status = EntryStatus::Resolved;
            }
            self.check_for_tree_resolution();
        }
    }

    fn fetch_dependencies(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &IndexMap<String, String>,
    ) {
        if dependencies.is_empty() {
            debug!("No dependencies to be fetched for {}@{}", name, version);
            self.check_for_tree_resolution();
            return;
        }

        for (dependency, range) in dependencies {
            debug!(
                "Found dependency for {}@{}: {}@{}",
                name, version, dependency, range
            );
            self.request_package(dependency, range);
        }
    }

    fn check_for_tree_resolution(&mut self) {
        if !self.is_complete() {
            return;
        }
        if self.report_emitted {
            debug!("Tree resolved again after the report was emitted; ignoring");
            return;
        }

        info!(
            "Tree has been resolved: {} package(s)",
            self.resolved_packages().len()
        );
        self.report = Some(self.extract_licenses_from_tree());
        self.report_emitted = true;
    }

    fn extract_licenses_from_tree(&self) -> LicenseReport {
        let mut report = LicenseReport::new();
        for tracked in self
            .entries
            .values()
            .filter(|tracked| tracked.status == EntryStatus::Resolved)
        {
            report.insert_package(tracked.entry.name(), tracked.entry.extract_licenses());
        }
        report.sort();
        report
    }

    /// True when no package is pending
    pub fn is_complete(&self) -> bool {
        self.entries
            .values()
            .all(|tracked| tracked.status == EntryStatus::Resolved)
    }

    pub fn report_emitted(&self) -> bool {
        self.report_emitted
    }

    pub fn status(&self, name: &str) -> Option<EntryStatus> {
        self.entries.get(name).map(|tracked| tracked.status)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.status(name) == Some(EntryStatus::Pending)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.status(name) == Some(EntryStatus::Resolved)
    }

    pub fn pending_packages(&self) -> Vec<&str> {
        self.packages_with(EntryStatus::Pending)
    }

    pub fn resolved_packages(&self) -> Vec<&str> {
        self.packages_with(EntryStatus::Resolved)
    }

    fn packages_with(&self, status: EntryStatus) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, tracked)| tracked.status == status)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.get(name).map(|tracked| &tracked.entry)
    }

    /// True if `version` of `name` is known, whether pending or resolved
    pub fn contains_version(&self, name: &str, version: &str) -> bool {
        self.entry(name)
            .is_some_and(|entry| entry.contains_version(version))
    }
}
