//! Pipeline types: inbound messages and per-message outcomes.

use serde::{Deserialize, Serialize};

use crate::signal::{SignalId, SignalRecord, SignalResult};

/// One message handed to the lifecycle manager by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation the reply goes back to.
    pub chat_id: String,
    /// Transport message id, used to thread the reply.
    pub message_id: Option<i64>,
    /// Text body. `None` means there is nothing to process.
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: None,
            text: Some(text.into()),
        }
    }

    pub fn with_message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// What happened to one inbound message.
///
/// Every variant except `Skipped` is paired with exactly one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No text body; nothing was parsed, stored or sent.
    Skipped,
    /// Usage help was sent.
    Help,
    /// A new signal record was created.
    Recorded(SignalRecord),
    /// Neither a command nor a complete signal.
    NotRecognized,
    /// The latest record was soft-cancelled.
    Cancelled(SignalId),
    /// The latest record was removed.
    Deleted(SignalId),
    /// Cancel requested but no record exists.
    NothingToCancel,
    /// Cancel requested but the latest record is already closed or cancelled.
    AlreadyFinal(SignalRecord),
    /// The latest eligible record was closed with a result.
    Marked { id: SignalId, result: SignalResult },
    /// Win/loss requested but no eligible record exists.
    NothingOpen,
    /// The storage collaborator failed; an error reply was sent.
    StorageFailed,
}

impl Outcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped => "skipped",
            Outcome::Help => "help",
            Outcome::Recorded(_) => "recorded",
            Outcome::NotRecognized => "not_recognized",
            Outcome::Cancelled(_) => "cancelled",
            Outcome::Deleted(_) => "deleted",
            Outcome::NothingToCancel => "nothing_to_cancel",
            Outcome::AlreadyFinal(_) => "already_final",
            Outcome::Marked { .. } => "marked",
            Outcome::NothingOpen => "nothing_open",
            Outcome::StorageFailed => "storage_failed",
        }
    }
}
