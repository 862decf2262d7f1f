//! npm registry API implementation

use tracing::{debug, warn};

use crate::metadata::error::RegistryError;
use crate::metadata::registry::Registry;
use crate::metadata::types::PackageMetadata;

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent("license-crawl")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_metadata(
        &self,
        package_name: &str,
        version: &str,
    ) -> Result<PackageMetadata, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}/{}", self.base_url, encoded_name, version);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!(
                "{}@{}",
                package_name, version
            )));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RegistryError::RateLimited {
                retry_after_secs: Self::retry_after_secs(&response),
            });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json::<PackageMetadata>().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }
}
