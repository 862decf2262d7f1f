//! Aggregated license report

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::metadata::semver::compare_version_tokens;

/// Version key used for a package version whose fetch failed
pub const UNKNOWN_VERSION: &str = "unknown_version";

/// License data of one package version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LicenseEntry {
    /// The license value exactly as declared by the package
    License(Value),
    /// The fetch failed; `version` is the token that was requested
    Failed { error: String, version: String },
}

impl LicenseEntry {
    pub fn is_failed(&self) -> bool {
        matches!(self, LicenseEntry::Failed { .. })
    }
}

/// Version token -> license of a single package
pub type PackageLicenses = IndexMap<String, LicenseEntry>;

/// Package name -> version token -> license
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LicenseReport {
    packages: IndexMap<String, PackageLicenses>,
}

impl LicenseReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the licenses of one package into the report.
    ///
    /// Existing version keys are kept, so the first entry merged for a key wins.
    pub fn insert_package(&mut self, name: &str, licenses: PackageLicenses) {
        let versions = self.packages.entry(name.to_string()).or_default();
        for (version, entry) in licenses {
            versions.entry(version).or_insert(entry);
        }
    }

    /// Order packages by name and each package's versions by version precedence
    pub fn sort(&mut self) {
        self.packages.sort_keys();
        for versions in self.packages.values_mut() {
            versions.sort_by(|a, _, b, _| compare_version_tokens(a, b));
        }
    }

    pub fn package(&self, name: &str) -> Option<&PackageLicenses> {
        self.packages.get(name)
    }

    pub fn license(&self, name: &str, version: &str) -> Option<&LicenseEntry> {
        self.packages.get(name)?.get(version)
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Number of failed fetches recorded in the report
    pub fn failure_count(&self) -> usize {
        self.packages
            .values()
            .flat_map(|versions| versions.values())
            .filter(|entry| entry.is_failed())
            .count()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
