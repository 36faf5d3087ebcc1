//! Public address resolution with bounded retry
//!
//! The resolver wraps a single-shot [`AddressSource`] and owns the retry
//! policy: a fixed number of attempts separated by a fixed delay. The delay
//! only separates attempts; nothing sleeps after the last one.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::{AddressFamily, AddressSource};

/// Default number of discovery attempts per family
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay between discovery attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// A validated public address for one family
///
/// Holds the trimmed discovery text once it has parsed as an address of the
/// family. The text is what gets compared with and written to the DNS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    family: AddressFamily,
    text: String,
}

impl ResolvedAddress {
    /// Validate `text` (after trimming) as an address of `family`
    pub fn parse(family: AddressFamily, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::malformed(format!("empty {} address", family)));
        }
        family.parse(text)?;
        Ok(Self {
            family,
            text: text.to_string(),
        })
    }

    /// The address family
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// The address as text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Address resolver with an attempt budget
pub struct AddressResolver {
    source: Box<dyn AddressSource>,
    max_attempts: usize,
    retry_delay: Duration,
}

impl AddressResolver {
    /// Create a resolver with the default budget (3 attempts, 2 s apart)
    pub fn new(source: Box<dyn AddressSource>) -> Self {
        Self::with_policy(source, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    /// Create a resolver with an explicit budget
    ///
    /// A budget of zero is raised to one attempt.
    pub fn with_policy(source: Box<dyn AddressSource>, max_attempts: usize, retry_delay: Duration) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Attempt budget
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Resolve the current public address for `family`
    ///
    /// # Returns
    ///
    /// - `Ok(ResolvedAddress)`: The first attempt that produced a valid address
    /// - `Err(Error::Resolution)`: Every attempt failed
    pub async fn resolve(&self, family: AddressFamily) -> Result<ResolvedAddress> {
        let endpoint = self.source.endpoint(family);
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let result = match self.source.fetch(family).await {
                Ok(body) => ResolvedAddress::parse(family, &body),
                Err(e) => Err(e),
            };

            match result {
                Ok(address) => {
                    info!(
                        "Attempt {}: resolved {} address {} from {}",
                        attempt,
                        family,
                        address.as_str(),
                        endpoint
                    );
                    return Ok(address);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{}: failed to retrieve {} address from {}: {}",
                        attempt, self.max_attempts, family, endpoint, e
                    );
                    last_error = e.to_string();

                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(Error::Resolution {
            family,
            attempts: self.max_attempts,
            last_error,
        })
    }
}
