// # Telegram Notifier
//
// Best-effort delivery of reconciliation outcomes to a Telegram chat.
//
// ## Trust Level: Untrusted
//
// - One `sendMessage` call per notification, never retried
// - Failures are logged at `warn` and swallowed
// - Bot token NEVER appears in logs or `Debug` output

use async_trait::async_trait;
use cfddns_core::config::NotifyConfig;
use cfddns_core::traits::Notifier;
use cfddns_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// HTTP timeout for Bot API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Notifier posting to the Telegram Bot API
pub struct TelegramNotifier {
    /// Bot API base URL without trailing slash
    api_url: String,

    /// Bot token
    /// ⚠️ NEVER log this value
    token: String,

    /// Destination chat
    chat_id: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a new notifier
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the token or chat is empty, or the HTTP
    ///   client cannot be built
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self> {
        let token = token.into();
        let chat_id = chat_id.into();

        if token.is_empty() {
            return Err(Error::config("Telegram bot token cannot be empty"));
        }
        if chat_id.is_empty() {
            return Err(Error::config("Telegram chat ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            chat_id,
            client,
        })
    }

    /// Create a notifier from the `[notify]` section
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.token.clone(),
            config.chat_id.clone(),
        )
    }

    /// Send `text`, reporting failures to the caller
    pub async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        // reqwest errors carry the URL, and the URL carries the token
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("sendMessage failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                "telegram",
                format!("sendMessage returned {}: {}", status, body),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) {
        match self.send(message).await {
            Ok(()) => tracing::debug!("Notification delivered to chat {}", self.chat_id),
            Err(e) => tracing::warn!("Failed to send Telegram notification: {}", e),
        }
    }
}
