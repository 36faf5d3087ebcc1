// # Cloudflare Record Store
//
// `RecordStore` implementation backed by the Cloudflare API v4.
//
// ## Trust Level: Untrusted (DNS Provider)
//
// - One HTTP request per trait call
// - Errors are returned to the reconciler, never retried here
// - No caching, no background tasks
// - Every request is bounded by a 10 second timeout
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::CloudflareConfig;
use cfddns_core::traits::{RecordSnapshot, RecordStore, RecordType};
use cfddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudflare";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// TTL written on every create and update
pub const RECORD_TTL: u32 = 1800;

/// Record id returned by `create` in dry-run mode
pub const DRY_RUN_RECORD_ID: &str = "dry-run";

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl<T> ApiEnvelope<T> {
    fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "no error details".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// DNS record as returned by the API
#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    content: String,
    ttl: Option<u32>,
    proxied: Option<bool>,
}

/// Request body for create and update
///
/// Updates always send the full body, so a record edited by hand gets its
/// TTL and proxy flag reset as well.
#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: RecordType,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl<'a> RecordBody<'a> {
    fn new(name: &'a str, record_type: RecordType, content: &'a str) -> Self {
        Self {
            record_type,
            name,
            content,
            ttl: RECORD_TTL,
            proxied: false,
        }
    }
}

/// Cloudflare record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, lookups are performed but `create` and `update`
/// only log the payload they would have sent.
pub struct CloudflareRecordStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone holding the record
    zone_id: String,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Skip mutations, log them instead
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRecordStore")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareRecordStore {
    /// Create a new record store
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the token or zone is empty, or the HTTP
    ///   client cannot be built
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        api_base: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if dry_run {
            tracing::warn!("Cloudflare record store running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            api_token,
            zone_id,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a record store from the `[cloudflare]` section
    pub fn from_config(config: &CloudflareConfig) -> Result<Self> {
        Self::new(
            config.api_token.clone(),
            config.zone_id.clone(),
            config.api_base.clone(),
            config.dry_run,
        )
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    /// Send an authenticated request and unwrap the API envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{} response could not be read: {}", action, e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, action));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("{} response: {}", action, e)))?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{} rejected: {}", action, envelope.error_summary()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| Error::malformed(format!("{} response has no result", action)))
    }
}

/// Map a non-success HTTP status to an error
///
/// A 404 from the list endpoint means the zone is unknown, so it is a
/// provider error and never "record not found".
fn status_error(status: StatusCode, body: &str, action: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            action, status
        )),
        409 => Error::provider(
            PROVIDER,
            format!(
                "Conflict: record is being modified by another process. Status: {}",
                status
            ),
        ),
        429 => Error::rate_limited(format!("{}: retry later. Status: {}", action, status)),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", action, status, body)),
    }
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    async fn fetch(&self, name: &str, record_type: RecordType) -> Result<Option<RecordSnapshot>> {
        tracing::debug!("Looking up {} record for {}", record_type, name);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("name", name), ("type", record_type.as_str())]);
        let records: Vec<ApiRecord> = self.execute(request, "Record lookup").await?;

        if records.len() > 1 {
            tracing::warn!(
                "Found {} {} records for {}, using the first one",
                records.len(),
                record_type,
                name
            );
        }

        Ok(records.into_iter().next().map(|record| {
            tracing::debug!("Found record ID: {}", record.id);
            RecordSnapshot {
                id: record.id,
                name: record.name,
                record_type,
                content: record.content,
                ttl: record.ttl,
                proxied: record.proxied,
            }
        }))
    }

    async fn create(&self, name: &str, record_type: RecordType, content: &str) -> Result<String> {
        let body = RecordBody::new(name, record_type, content);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_url(),
                serde_json::to_string(&body)?
            );
            return Ok(DRY_RUN_RECORD_ID.to_string());
        }

        tracing::info!("Creating {} record {} -> {}", record_type, name, content);
        let request = self.client.post(self.records_url()).json(&body);
        let record: ApiRecord = self.execute(request, "Record creation").await?;
        Ok(record.id)
    }

    async fn update(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<()> {
        let url = format!("{}/{}", self.records_url(), record_id);
        let body = RecordBody::new(name, record_type, content);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&body)?
            );
            return Ok(());
        }

        tracing::info!("Updating {} record {} -> {}", record_type, name, content);
        let request = self.client.put(&url).json(&body);
        let _: ApiRecord = self.execute(request, "Record update").await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
