// # Record Store Trait
//
// Defines the interface for reading and writing DNS records at the provider.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::{RecordStore, RecordType};
//
// match store.fetch("home.example.com", RecordType::A).await? {
//     Some(record) => store.update(&record.id, "home.example.com", RecordType::A, "203.0.113.5").await?,
//     None => { store.create("home.example.com", RecordType::A, "203.0.113.5").await?; }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// DNS record type managed by cfddns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a DNS record as reported by the provider
///
/// The core never keeps one of these across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Provider-assigned record identifier
    pub id: String,
    /// Record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record content (an IP literal for A/AAAA)
    pub content: String,
    /// Time-to-live, if the provider reported one
    pub ttl: Option<u32>,
    /// Proxy flag, if the provider reported one
    pub proxied: Option<bool>,
}

/// Trait for DNS record store implementations
///
/// Every method is a single request against the provider. Errors are
/// returned, never retried: the caller decides what a failure means.
///
/// # Absence vs. failure
///
/// [`fetch`](RecordStore::fetch) returns `Ok(None)` only when the provider
/// answered successfully with no matching record. A request that fails or a
/// body that does not decode is an `Err`, so a transient provider problem can
/// never be mistaken for a missing record and trigger a creation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record matching `name` and `record_type` exactly
    ///
    /// If the provider returns more than one match, the first one is taken
    /// as authoritative.
    async fn fetch(&self, name: &str, record_type: RecordType) -> Result<Option<RecordSnapshot>>;

    /// Create a record and return its provider-assigned identifier
    async fn create(&self, name: &str, record_type: RecordType, content: &str) -> Result<String>;

    /// Replace an existing record
    ///
    /// Full-replace semantics: implementations resend every field (type,
    /// name, content, TTL, proxied), not only the content.
    async fn update(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<()>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_wire_names() {
        assert_eq!(RecordType::A.as_str(), "A");
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
        assert_eq!(serde_json::to_string(&RecordType::Aaaa).unwrap(), "\"AAAA\"");
        let parsed: RecordType = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, RecordType::A);
    }
}
