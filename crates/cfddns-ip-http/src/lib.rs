// # HTTP Address Source
//
// Discovers this host's public address by asking an HTTP echo service.
//
// ## Behavior
//
// One GET per `fetch()` call against the family's configured URL. The raw
// response body is returned untouched; trimming and address validation happen
// in `AddressResolver`, which also owns the retry policy.
//
// ## Trust Level: Untrusted
//
// - No retries, no caching, no background tasks
// - Every request is bounded by the configured timeout

use async_trait::async_trait;
use cfddns_core::config::DiscoveryConfig;
use cfddns_core::traits::{AddressFamily, AddressSource};
use cfddns_core::{Error, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Address source backed by plain-text echo services
#[derive(Debug, Clone)]
pub struct HttpAddressSource {
    /// Endpoint answering with the IPv4 address
    ipv4_url: String,

    /// Endpoint answering with the IPv6 address
    ipv6_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a source with the default timeout
    pub fn new(ipv4_url: impl Into<String>, ipv6_url: impl Into<String>) -> Self {
        Self::with_timeout(ipv4_url, ipv6_url, DEFAULT_TIMEOUT)
    }

    /// Create a source with an explicit request timeout
    pub fn with_timeout(
        ipv4_url: impl Into<String>,
        ipv6_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a source from the `[discovery]` section
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::with_timeout(
            config.url(AddressFamily::V4),
            config.url(AddressFamily::V6),
            config.timeout(),
        )
    }
}

#[async_trait]
impl AddressSource for HttpAddressSource {
    async fn fetch(&self, family: AddressFamily) -> Result<String> {
        let url = self.endpoint(family);
        tracing::debug!("Requesting {} address from {}", family, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", url, e)))?;

        // Only a plain 200 carries an address
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::transport(format!("HTTP {} from {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response from {}: {}", url, e)))
    }

    fn endpoint(&self, family: AddressFamily) -> String {
        match family {
            AddressFamily::V4 => self.ipv4_url.clone(),
            AddressFamily::V6 => self.ipv6_url.clone(),
        }
    }
}
