//! Registry trait for fetching package metadata from remote sources

#[cfg(test)]
use mockall::automock;

use crate::metadata::error::RegistryError;
use crate::metadata::types::PackageMetadata;

/// Trait for fetching the metadata of one package version from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the metadata for a concrete version of a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "@types/node")
    /// * `version` - A version token as produced by a range normalizer (e.g., "1.2.3" or "latest")
    ///
    /// # Returns
    /// * `Ok(PackageMetadata)` - Declared dependencies and license of that version
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_metadata(
        &self,
        package_name: &str,
        version: &str,
    ) -> Result<PackageMetadata, RegistryError>;
}
