// # Notifier Trait
//
// Defines the interface for operator notifications.
//
// ## Implementations
//
// - Telegram bot API: `cfddns-notify-telegram` crate
// - [`NoopNotifier`]: notifications disabled

use async_trait::async_trait;

/// Trait for best-effort message delivery
///
/// Delivery is fire-and-forget. Implementations log their own failures and
/// return normally.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` as plain text
    async fn notify(&self, message: &str);
}

/// Notifier that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) {
        tracing::debug!("Notifications disabled, dropping message: {}", message);
    }
}
