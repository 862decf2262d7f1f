//! All known versions of one package name

use std::collections::HashMap;

use crate::crawl::fetcher::Fetcher;
use crate::crawl::record::{Completion, VersionRecord};
use crate::crawl::report::PackageLicenses;
use crate::metadata::semver::compare_version_tokens;

pub struct PackageEntry {
    name: String,
    versions: HashMap<String, VersionRecord>,
}

impl PackageEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            versions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &VersionRecord> {
        self.versions.values()
    }

    /// Subscribe to the record for `version`, creating it and starting its
    /// fetch if this is the first request for that version. Must run inside
    /// a tokio runtime.
    pub fn ensure_version_fetched(&mut self, version: &str, fetcher: &Fetcher) -> Completion {
        let name = &self.name;
        let record = self
            .versions
            .entry(version.to_string())
            .or_insert_with(|| {
                let record = VersionRecord::new(name, version);
                record.fetch(fetcher);
                record
            });

        record.subscribe()
    }

    /// True when every known version has finished fetching, successfully or not
    pub fn is_fully_settled(&self) -> bool {
        self.versions.values().all(VersionRecord::is_settled)
    }

    /// Licenses of every settled version, ordered by version.
    ///
    /// All failures share the [`crate::crawl::report::UNKNOWN_VERSION`] key;
    /// the lowest failed version fills it.
    pub fn extract_licenses(&self) -> PackageLicenses {
        let mut records: Vec<&VersionRecord> = self.versions.values().collect();
        records.sort_by(|a, b| compare_version_tokens(a.version(), b.version()));

        let mut licenses = PackageLicenses::new();
        for (version, entry) in records.into_iter().filter_map(VersionRecord::extract_license) {
            licenses.entry(version).or_insert(entry);
        }
        licenses.sort_by(|a, _, b, _| compare_version_tokens(a, b));
        licenses
    }
}
