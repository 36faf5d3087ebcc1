// # Address Source Trait
//
// Defines the interface for discovering the current public address.
//
// ## Implementations
//
// - Plain-text HTTP discovery: `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::{AddressFamily, AddressSource};
//
// let text = source.fetch(AddressFamily::V4).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};
use crate::traits::RecordType;

/// Address family handled by one reconciliation sub-pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4, published as an `A` record
    V4,
    /// IPv6, published as an `AAAA` record
    V6,
}

impl AddressFamily {
    /// DNS record type carrying this family
    pub fn record_type(self) -> RecordType {
        match self {
            AddressFamily::V4 => RecordType::A,
            AddressFamily::V6 => RecordType::Aaaa,
        }
    }

    /// Human-readable label used in logs and notifications
    pub fn label(self) -> &'static str {
        match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        }
    }

    /// Parse `text` as an address of this family
    ///
    /// IPv4 must be a plain dotted quad; IPv4-mapped or other IPv6 forms
    /// are rejected for the `V4` family and vice versa.
    pub fn parse(self, text: &str) -> Result<IpAddr> {
        match self {
            AddressFamily::V4 => text
                .parse::<Ipv4Addr>()
                .map(IpAddr::V4)
                .map_err(|_| Error::invalid_input(format!("not a valid IPv4 address: {:?}", text))),
            AddressFamily::V6 => text
                .parse::<Ipv6Addr>()
                .map(IpAddr::V6)
                .map_err(|_| Error::invalid_input(format!("not a valid IPv6 address: {:?}", text))),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait for public address discovery
///
/// # Single-Shot
///
/// Implementations perform exactly one lookup per call and return its raw
/// text. Retry, delay and validation are owned by
/// [`AddressResolver`](crate::resolver::AddressResolver); an implementation
/// that loops internally breaks the resolver's attempt accounting.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the current public address for `family`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The response body, untrimmed
    /// - `Err(Error)`: Transport failure or non-success status
    async fn fetch(&self, family: AddressFamily) -> Result<String>;

    /// Where this source looks up `family` (for logging)
    fn endpoint(&self, family: AddressFamily) -> String;
}
