//! Registry access shared by every version record of a crawl

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::CrawlConfig;
use crate::metadata::error::RegistryError;
use crate::metadata::registry::Registry;
use crate::metadata::types::PackageMetadata;

/// Registry handle with a per-fetch timeout and a cap on concurrent requests
#[derive(Clone)]
pub struct Fetcher {
    registry: Arc<dyn Registry>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(registry: Arc<dyn Registry>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            registry,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(registry: Arc<dyn Registry>, config: &CrawlConfig) -> Self {
        Self::new(
            registry,
            Duration::from_millis(config.fetch.timeout_ms),
            config.fetch.max_concurrent,
        )
    }

    /// Fetch one package version. The timeout covers only the registry
    /// request, not the wait for a free request slot.
    pub async fn fetch(
        &self,
        package_name: &str,
        version: &str,
    ) -> Result<PackageMetadata, RegistryError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RegistryError::Aborted)?;

        tokio::time::timeout(
            self.timeout,
            self.registry.fetch_metadata(package_name, version),
        )
        .await
        .map_err(|_| RegistryError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::registry::MockRegistry;

    #[tokio::test]
    async fn fetch_passes_through_registry_result() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .withf(|name, version| name == "a" && version == "1.0.0")
            .times(1)
            .returning(|_, _| Ok(PackageMetadata::new("a", "1.0.0").with_license("MIT")));

        let fetcher = Fetcher::new(Arc::new(registry), Duration::from_secs(5), 4);
        let metadata = fetcher.fetch("a", "1.0.0").await.unwrap();

        assert_eq!(metadata, PackageMetadata::new("a", "1.0.0").with_license("MIT"));
    }

    struct HangingRegistry;

    #[async_trait::async_trait]
    impl Registry for HangingRegistry {
        async fn fetch_metadata(
            &self,
            _package_name: &str,
            _version: &str,
        ) -> Result<PackageMetadata, RegistryError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn fetch_times_out_hung_request() {
        let fetcher = Fetcher::new(Arc::new(HangingRegistry), Duration::from_millis(20), 1);

        let result = fetcher.fetch("slow", "1.0.0").await;

        assert!(matches!(result, Err(RegistryError::Timeout(20))));
    }

    #[tokio::test]
    async fn zero_concurrency_is_raised_to_one() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_metadata()
            .returning(|name, version| Ok(PackageMetadata::new(name, version)));

        let fetcher = Fetcher::new(Arc::new(registry), Duration::from_secs(5), 0);

        assert!(fetcher.fetch("a", "1.0.0").await.is_ok());
    }
}
