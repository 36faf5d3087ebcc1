//! Configuration types for cfddns
//!
//! This module defines the configuration file layout, its defaults and its
//! validation. The configuration is loaded once at startup and handed to
//! constructors by value; nothing reads it from global state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::engine::ReconcileSettings;
use crate::error::{Error, Result};
use crate::traits::AddressFamily;

/// Cloudflare API v4 base URL
pub const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Telegram bot API base URL
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Environment variable overriding `cloudflare.api_token`
pub const ENV_API_TOKEN: &str = "CFDDNS_API_TOKEN";

/// Environment variable overriding `notify.token`
pub const ENV_TG_TOKEN: &str = "CFDDNS_TG_TOKEN";

/// Commented template written when no configuration file exists
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# cfddns configuration

[cloudflare]
# API token with Zone:DNS:Edit permission (or set CFDDNS_API_TOKEN)
api_token = ""
zone_id = ""
# Record kept in sync with this host's public address
record_name = ""
# api_base = "https://api.cloudflare.com/client/v4"
# Log intended changes without sending them
dry_run = false

[discovery]
# ipv4, ipv6 or both
mode = "both"
ipv4_url = "https://4.ipw.cn"
ipv6_url = "https://6.ipw.cn"
retry_count = 3
retry_delay_secs = 2
timeout_secs = 10

[engine]
# Seconds between reconciliation passes
interval_secs = 60
# Create the record when it does not exist yet
add_record_if_missing = true

[notify]
enabled = false
api_url = "https://api.telegram.org"
# Bot token (or set CFDDNS_TG_TOKEN)
token = ""
chat_id = ""

[log]
# trace, debug, info, warn or error; RUST_LOG takes precedence
level = "info"
"#;

/// Main cfddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfDdnsConfig {
    /// DNS provider settings
    pub cloudflare: CloudflareConfig,

    /// Public address discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Reconciliation settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

impl CfDdnsConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Write [`DEFAULT_CONFIG_TEMPLATE`] to `path`
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        Ok(())
    }

    /// Apply secret overrides from the environment
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`. Empty values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty()) {
            self.cloudflare.api_token = token;
        }
        if let Some(token) = lookup(ENV_TG_TOKEN).filter(|v| !v.is_empty()) {
            self.notify.token = token;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.cloudflare.validate()?;
        self.discovery.validate()?;
        self.engine.validate()?;
        self.notify.validate()?;
        Ok(())
    }

    /// Settings for the [`Reconciler`](crate::engine::Reconciler)
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            record_name: self.cloudflare.record_name.clone(),
            families: self.discovery.mode.families(),
            add_if_missing: self.engine.add_record_if_missing,
            notify: self.notify.enabled,
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.starts_with("your_") || lower.ends_with("_here") || lower == "replace_me"
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{} cannot be empty", field)));
    }
    if is_placeholder(value) {
        return Err(Error::config(format!(
            "{} still holds the placeholder value from the default configuration",
            field
        )));
    }
    Ok(())
}

fn require_http_url(field: &str, value: &str) -> Result<()> {
    if !value.starts_with("https://") && !value.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use an HTTP or HTTPS scheme. Got: {}",
            field, value
        )));
    }
    Ok(())
}

/// Cloudflare provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// API token (never logged)
    pub api_token: String,

    /// Zone identifier
    pub zone_id: String,

    /// Record name to keep in sync (e.g. "home.example.com")
    pub record_name: String,

    /// API base URL
    #[serde(default = "default_cloudflare_api_base")]
    pub api_base: String,

    /// Perform lookups but skip mutations
    #[serde(default)]
    pub dry_run: bool,
}

impl CloudflareConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        require("cloudflare.api_token", &self.api_token)?;
        require("cloudflare.zone_id", &self.zone_id)?;
        require("cloudflare.record_name", &self.record_name)?;
        if self.record_name.len() > 253 {
            return Err(Error::config(format!(
                "cloudflare.record_name too long: {} chars (max 253)",
                self.record_name.len()
            )));
        }
        require_http_url("cloudflare.api_base", &self.api_base)
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Which address families to keep in sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyMode {
    /// IPv4 (`A`) only
    #[serde(alias = "4")]
    Ipv4,
    /// IPv6 (`AAAA`) only
    #[serde(alias = "6")]
    Ipv6,
    /// Both, IPv4 first
    #[default]
    #[serde(alias = "10")]
    Both,
}

impl FamilyMode {
    /// Families in processing order
    pub fn families(self) -> Vec<AddressFamily> {
        match self {
            FamilyMode::Ipv4 => vec![AddressFamily::V4],
            FamilyMode::Ipv6 => vec![AddressFamily::V6],
            FamilyMode::Both => vec![AddressFamily::V4, AddressFamily::V6],
        }
    }
}

/// Public address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Families to reconcile
    #[serde(default)]
    pub mode: FamilyMode,

    /// URL returning the public IPv4 address as plain text
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,

    /// URL returning the public IPv6 address as plain text
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,

    /// Attempts per family per pass (0 means the default)
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,

    /// Delay between attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<()> {
        for family in self.mode.families() {
            let field = match family {
                AddressFamily::V4 => "discovery.ipv4_url",
                AddressFamily::V6 => "discovery.ipv6_url",
            };
            let url = self.url(family);
            if url.is_empty() {
                return Err(Error::config(format!("{} cannot be empty", field)));
            }
            require_http_url(field, url)?;
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("discovery.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Discovery URL for `family`
    pub fn url(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.ipv4_url,
            AddressFamily::V6 => &self.ipv6_url,
        }
    }

    /// Attempts per family per pass, with 0 read as unset
    pub fn attempts(&self) -> usize {
        match self.retry_count {
            0 => default_retry_count(),
            n => n,
        }
    }

    /// Delay between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: FamilyMode::default(),
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
            retry_count: default_retry_count(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between passes in daemon mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Create the record when the provider has none
    #[serde(default = "default_add_record_if_missing")]
    pub add_record_if_missing: bool,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::config("engine.interval_secs must be > 0"));
        }
        Ok(())
    }

    /// Interval between passes
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            add_record_if_missing: default_add_record_if_missing(),
        }
    }
}

/// Notification configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Send notifications at all
    #[serde(default)]
    pub enabled: bool,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,

    /// Bot token (never logged)
    #[serde(default)]
    pub token: String,

    /// Destination chat
    #[serde(default)]
    pub chat_id: String,
}

impl NotifyConfig {
    /// Validate the notification configuration
    ///
    /// Token and chat are only required when notifications are enabled.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        require("notify.token", &self.token)?;
        require("notify.chat_id", &self.chat_id)?;
        require_http_url("notify.api_url", &self.api_url)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_telegram_api_url(),
            token: String::new(),
            chat_id: String::new(),
        }
    }
}

// Custom Debug implementation that hides the bot token
impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_cloudflare_api_base() -> String {
    DEFAULT_CLOUDFLARE_API_BASE.to_string()
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_ipv4_url() -> String {
    "https://4.ipw.cn".to_string()
}

fn default_ipv6_url() -> String {
    "https://6.ipw.cn".to_string()
}

fn default_retry_count() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_add_record_if_missing() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
