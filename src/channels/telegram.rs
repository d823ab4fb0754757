//! Telegram Bot API: webhook update types and the `sendMessage` notifier.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::channels::Notifier;
use crate::error::ChannelError;
use crate::pipeline::InboundMessage;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// ── Webhook payload ─────────────────────────────────────────────────

/// The subset of a Telegram `Update` the webhook consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<Message>,
    /// Posts in channels the bot administers.
    pub channel_post: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    /// Text attached to media messages.
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// The message to process, if the update carries one.
    ///
    /// `message` wins over `channel_post`; media captions stand in for a
    /// missing text body.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message.or(self.channel_post)?;
        Some(InboundMessage {
            chat_id: message.chat.id.to_string(),
            message_id: Some(message.message_id),
            text: message.text.or(message.caption),
        })
    }
}

// ── Notifier ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_sending_without_reply: Option<bool>,
}

/// Sends plain-text replies through the Bot API.
pub struct TelegramNotifier {
    bot_token: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_base: TELEGRAM_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Verify the token with `getMe`.
    pub async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.without_url().to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Http(format!("getMe returned {}", resp.status())))
        }
    }

    /// Send a single message chunk (at most 4096 chars).
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        let body = SendMessage {
            chat_id,
            text,
            reply_to_message_id: reply_to,
            allow_sending_without_reply: reply_to.map(|_| true),
        };

        // Errors can embed the request URL, which contains the token.
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.without_url().to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Long texts are split; only the first chunk threads onto `reply_to`.
    async fn notify(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        if chat_id.is_empty() {
            return Err(ChannelError::InvalidMessage("empty chat_id".into()));
        }

        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        for (i, chunk) in chunks.iter().enumerate() {
            let reply_to = if i == 0 { reply_to } else { None };
            self.send_message_chunk(chat_id, chunk, reply_to).await?;
        }
        tracing::debug!(chat_id, chunks = chunks.len(), "Telegram message sent");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        // Byte offset of the first char past the limit.
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&at| at > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    fn notifier(token: &str) -> TelegramNotifier {
        TelegramNotifier::new(SecretString::from(token.to_string()))
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            notifier("123:ABC").api_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn telegram_api_url_custom_base() {
        let n = notifier("T").with_api_base("http://127.0.0.1:9000/");
        assert_eq!(n.api_url("getMe"), "http://127.0.0.1:9000/botT/getMe");
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn update_message_to_inbound() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 55,
                "chat": {"id": -100123, "type": "group"},
                "text": "buy xauusd 2000 sl 1990 tp 2010"
            }
        }))
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.chat_id, "-100123");
        assert_eq!(inbound.message_id, Some(55));
        assert_eq!(inbound.text.as_deref(), Some("buy xauusd 2000 sl 1990 tp 2010"));
    }

    #[test]
    fn update_channel_post_to_inbound() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 2,
            "channel_post": {
                "message_id": 9,
                "chat": {"id": 777, "type": "channel"},
                "text": "hit"
            }
        }))
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.chat_id, "777");
        assert_eq!(inbound.text.as_deref(), Some("hit"));
    }

    #[test]
    fn update_caption_stands_in_for_text() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "message": {
                "message_id": 3,
                "chat": {"id": 1},
                "caption": "sell eurusd 1.1 sl 1.2 tp 1.0"
            }
        }))
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.text.as_deref(), Some("sell eurusd 1.1 sl 1.2 tp 1.0"));
    }

    #[test]
    fn update_without_message_is_none() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 4,
            "edited_message": {"message_id": 1, "chat": {"id": 1}, "text": "x"}
        }))
        .unwrap();
        assert!(update.into_inbound().is_none());
    }

    // ── Sending ─────────────────────────────────────────────────────

    type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn capture(
        State(captured): State<Captured>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        captured.lock().unwrap().push(body);
        Json(serde_json::json!({"ok": true}))
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::BAD_REQUEST, r#"{"ok":false,"description":"chat not found"}"#)
    }

    async fn mock_bot_api() -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/botGOOD/sendMessage", post(capture))
            .route("/botBAD/sendMessage", post(reject))
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn notify_sends_plain_text_reply() {
        let (base, captured) = mock_bot_api().await;
        let n = notifier("GOOD").with_api_base(base);

        n.notify("42", "✅ Signal recorded", Some(10)).await.unwrap();

        let bodies = captured.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["chat_id"], "42");
        assert_eq!(bodies[0]["text"], "✅ Signal recorded");
        assert_eq!(bodies[0]["reply_to_message_id"], 10);
        assert!(bodies[0].get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn notify_without_reply_omits_thread_fields() {
        let (base, captured) = mock_bot_api().await;
        let n = notifier("GOOD").with_api_base(base);

        n.notify("42", "hello", None).await.unwrap();

        let bodies = captured.lock().unwrap().clone();
        assert!(bodies[0].get("reply_to_message_id").is_none());
        assert!(bodies[0].get("allow_sending_without_reply").is_none());
    }

    #[tokio::test]
    async fn notify_long_text_threads_first_chunk_only() {
        let (base, captured) = mock_bot_api().await;
        let n = notifier("GOOD").with_api_base(base);
        let text = format!("{}\n{}", "a".repeat(3000), "b".repeat(3000));

        n.notify("42", &text, Some(7)).await.unwrap();

        let bodies = captured.lock().unwrap().clone();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0]["reply_to_message_id"], 7);
        assert!(bodies[1].get("reply_to_message_id").is_none());
    }

    #[tokio::test]
    async fn notify_api_error_is_send_failed() {
        let (base, _) = mock_bot_api().await;
        let n = notifier("BAD").with_api_base(base);

        let err = n.notify("42", "hello", None).await.unwrap_err();
        match err {
            ChannelError::SendFailed { name, reason } => {
                assert_eq!(name, "telegram");
                assert!(reason.contains("400"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn notify_empty_chat_id_rejected() {
        let err = notifier("GOOD").notify("", "hello", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
    }

    // ── Message splitting tests ─────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_over_limit_on_space() {
        let msg = format!("{} {}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_counts_chars_not_bytes() {
        let msg = "€".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);

        let msg = "€".repeat(4100);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].chars().count(), 4);
    }
}
