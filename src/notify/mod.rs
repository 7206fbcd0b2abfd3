//! Outbound chat notifications.
//!
//! Delivery is a single best-effort call per event. Callers log failures and
//! carry on; nothing is queued or retried.

mod messages;
mod telegram;

use async_trait::async_trait;
use thiserror::Error;

pub use messages::{escape_html, new_application_message, status_changed_message, status_label};
pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification response error: {0}")]
    Response(String),

    #[error("messaging API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Sends an HTML-formatted message to one chat.
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Sends to the fixed administrator channel.
    async fn notify_admin(&self, text: &str) -> Result<(), NotifyError>;
}

/// Used when no bot is configured. Messages are dropped after a debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, chat_id: &str, _text: &str) -> Result<(), NotifyError> {
        tracing::debug!(chat_id, "notifications disabled, dropping message");
        Ok(())
    }

    async fn notify_admin(&self, _text: &str) -> Result<(), NotifyError> {
        tracing::debug!("notifications disabled, dropping admin message");
        Ok(())
    }
}
