//! Outbound notification channels.

pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use telegram::{TelegramNotifier, Update};

/// Sends a text message back to the conversation a signal came from.
///
/// Callers treat delivery as fire-and-forget: a failure is logged and never
/// changes the outcome of the message that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    async fn notify(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError>;
}

/// Notifier used when no bot token is configured: writes replies to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        tracing::info!(chat_id, reply_to, text, "Notification (no bot token configured)");
        Ok(())
    }
}
