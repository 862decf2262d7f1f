//! Registry test utilities

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use license_crawl::config::{CrawlConfig, FetchConfig};
use license_crawl::metadata::error::RegistryError;
use license_crawl::metadata::registry::Registry;
use license_crawl::metadata::types::PackageMetadata;

enum FakeResponse {
    Found(PackageMetadata),
    Fail(String),
    Hang,
}

/// In-memory registry keyed by (name, version token) that counts requests
pub struct FakeRegistry {
    responses: HashMap<(String, String), FakeResponse>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<(String, String), usize>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_package(
        mut self,
        name: &str,
        version: &str,
        license: &str,
        dependencies: &[(&str, &str)],
    ) -> Self {
        let metadata = dependencies.iter().fold(
            PackageMetadata::new(name, version).with_license(license),
            |metadata, (dependency, range)| metadata.with_dependency(dependency, range),
        );
        self.responses.insert(
            (name.to_string(), version.to_string()),
            FakeResponse::Found(metadata),
        );
        self
    }

    /// Answer with a raw registry payload, parsed the way a registry response is
    pub fn with_payload(mut self, name: &str, version: &str, payload: serde_json::Value) -> Self {
        let metadata: PackageMetadata =
            serde_json::from_value(payload).expect("payload should parse as package metadata");
        self.responses.insert(
            (name.to_string(), version.to_string()),
            FakeResponse::Found(metadata),
        );
        self
    }

    /// Fail every request for this version with a network-style error
    pub fn with_failure(mut self, name: &str, version: &str, message: &str) -> Self {
        self.responses.insert(
            (name.to_string(), version.to_string()),
            FakeResponse::Fail(message.to_string()),
        );
        self
    }

    /// Never answer requests for this version
    pub fn with_hang(mut self, name: &str, version: &str) -> Self {
        self.responses
            .insert((name.to_string(), version.to_string()), FakeResponse::Hang);
        self
    }

    /// Delay every response for this package
    pub fn with_delay(mut self, name: &str, millis: u64) -> Self {
        self.delays
            .insert(name.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn calls(&self, name: &str, version: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(name.to_string(), version.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn fetch_metadata(
        &self,
        package_name: &str,
        version: &str,
    ) -> Result<PackageMetadata, RegistryError> {
        let key = (package_name.to_string(), version.to_string());
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if let Some(delay) = self.delays.get(package_name) {
            tokio::time::sleep(*delay).await;
        }

        match self.responses.get(&key) {
            Some(FakeResponse::Found(metadata)) => Ok(metadata.clone()),
            Some(FakeResponse::Fail(message)) => {
                Err(RegistryError::InvalidResponse(message.clone()))
            }
            Some(FakeResponse::Hang) => std::future::pending().await,
            None => Err(RegistryError::NotFound(format!(
                "{}@{}",
                package_name, version
            ))),
        }
    }
}

/// Config with a short timeout suitable for tests
pub fn test_config() -> CrawlConfig {
    CrawlConfig {
        fetch: FetchConfig {
            timeout_ms: 2_000,
            max_concurrent: 8,
        },
        ..CrawlConfig::default()
    }
}
