//! Record lifecycle manager: one inbound message in, one outcome out.
//!
//! Flow per message:
//! 1. Normalize the text
//! 2. Commands first: cancel / win / loss / start
//! 3. Otherwise run the extractor and record a new signal
//! 4. Send exactly one reply
//!
//! All shared state lives in the store. Each message does at most one
//! storage read, one storage write and one notification, in that order.

use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::channels::Notifier;
use crate::config::{CancelMode, LifecyclePolicy, MarkEligibility, ParserConfig};
use crate::error::DatabaseError;
use crate::pipeline::replies;
use crate::pipeline::types::{InboundMessage, Outcome};
use crate::signal::{
    CommandClassifier, CommandIntent, NewSignal, NormalizedText, SignalExtractor, SignalPatch,
    SignalResult, SignalStatus, normalize,
};
use crate::store::SignalStore;

/// Handles inbound messages against a store and a notifier.
pub struct SignalProcessor {
    store: Arc<dyn SignalStore>,
    notifier: Arc<dyn Notifier>,
    extractor: SignalExtractor,
    classifier: CommandClassifier,
    policy: LifecyclePolicy,
    help_text: String,
}

impl SignalProcessor {
    pub fn new(
        store: Arc<dyn SignalStore>,
        notifier: Arc<dyn Notifier>,
        parser: &ParserConfig,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            extractor: SignalExtractor::new(parser),
            classifier: CommandClassifier::default(),
            policy,
            help_text: replies::help(parser),
        }
    }

    /// Extra phrases that trigger the help reply.
    pub fn with_start_aliases(mut self, aliases: &[String]) -> Self {
        self.classifier = CommandClassifier::with_start_aliases(aliases);
        self
    }

    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    /// Process one message. Never fails: storage errors become an error
    /// reply and `Outcome::StorageFailed`, notification errors are logged.
    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        let span = info_span!(
            "signal_message",
            request_id = %Uuid::new_v4(),
            chat_id = %message.chat_id,
        );
        self.process(message).instrument(span).await
    }

    async fn process(&self, message: InboundMessage) -> Outcome {
        let Some(raw_text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            debug!("No text body, nothing to process");
            return Outcome::Skipped;
        };

        let normalized = normalize(raw_text);
        let intent = self.classifier.classify(&normalized);
        debug!(?intent, "Message classified");

        let (outcome, reply) = match intent {
            CommandIntent::Start => (Outcome::Help, self.help_text.clone()),
            CommandIntent::CancelLast => self.cancel_latest().await,
            CommandIntent::MarkWin => self.mark_latest(SignalResult::Win).await,
            CommandIntent::MarkLoss => self.mark_latest(SignalResult::Loss).await,
            CommandIntent::None => self.record(&normalized, raw_text).await,
        };

        if let Err(e) = self
            .notifier
            .notify(&message.chat_id, &reply, message.message_id)
            .await
        {
            warn!(
                notifier = self.notifier.name(),
                outcome = outcome.label(),
                "Failed to send reply: {e}"
            );
        }

        outcome
    }

    // ── New signals ─────────────────────────────────────────────────

    async fn record(&self, normalized: &NormalizedText, raw_text: &str) -> (Outcome, String) {
        let Some(candidate) = self.extractor.extract(normalized, raw_text) else {
            info!(text = %normalized, "Message not recognized as a signal");
            return (Outcome::NotRecognized, replies::not_recognized(raw_text));
        };

        match self.store.insert_signal(&NewSignal::from(&candidate)).await {
            Ok(record) => {
                info!(
                    signal_id = %record.id,
                    side = %record.side,
                    order_kind = record.order_kind.as_str(),
                    symbol = %record.symbol,
                    entry = %record.entry,
                    status = %record.status,
                    "Signal recorded"
                );
                let reply = replies::recorded(&record);
                (Outcome::Recorded(record), reply)
            }
            Err(e) => storage_failure("saving the signal", e),
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Cancel targets the latest record regardless of status.
    async fn cancel_latest(&self) -> (Outcome, String) {
        let latest = match self.store.latest_signal(None).await {
            Ok(Some(record)) => record,
            Ok(None) => return (Outcome::NothingToCancel, replies::nothing_to_cancel()),
            Err(e) => return storage_failure("looking up the latest signal", e),
        };

        match self.policy.cancel_mode {
            CancelMode::Delete => match self.store.delete_signal(latest.id).await {
                Ok(()) => {
                    info!(signal_id = %latest.id, "Signal deleted");
                    (Outcome::Deleted(latest.id), replies::deleted(&latest))
                }
                Err(DatabaseError::NotFound { .. }) => {
                    (Outcome::NothingToCancel, replies::nothing_to_cancel())
                }
                Err(e) => storage_failure("deleting the signal", e),
            },
            CancelMode::Soft => {
                if latest.status.is_terminal() {
                    info!(signal_id = %latest.id, status = %latest.status, "Latest signal already final");
                    let reply = replies::already_final(&latest);
                    return (Outcome::AlreadyFinal(latest), reply);
                }
                match self.store.update_signal(latest.id, &SignalPatch::cancel()).await {
                    Ok(()) => {
                        info!(signal_id = %latest.id, "Signal cancelled");
                        (Outcome::Cancelled(latest.id), replies::cancelled(&latest))
                    }
                    Err(DatabaseError::NotFound { .. }) => {
                        (Outcome::NothingToCancel, replies::nothing_to_cancel())
                    }
                    Err(e) => storage_failure("cancelling the signal", e),
                }
            }
        }
    }

    /// Win/loss targets the latest record still eligible for a result.
    async fn mark_latest(&self, result: SignalResult) -> (Outcome, String) {
        let eligible = eligible_statuses(self.policy.mark_eligibility);
        let latest = match self.store.latest_signal(Some(eligible)).await {
            Ok(Some(record)) => record,
            Ok(None) => return (Outcome::NothingOpen, replies::nothing_open()),
            Err(e) => return storage_failure("looking up the latest open signal", e),
        };

        match self
            .store
            .update_signal(latest.id, &SignalPatch::close(result))
            .await
        {
            Ok(()) => {
                info!(signal_id = %latest.id, %result, "Signal closed");
                let reply = replies::marked(&latest, result);
                (
                    Outcome::Marked {
                        id: latest.id,
                        result,
                    },
                    reply,
                )
            }
            Err(DatabaseError::NotFound { .. }) => (Outcome::NothingOpen, replies::nothing_open()),
            Err(e) => storage_failure("updating the signal result", e),
        }
    }
}

fn eligible_statuses(eligibility: MarkEligibility) -> &'static [SignalStatus] {
    match eligibility {
        MarkEligibility::OpenOnly => &[SignalStatus::Open],
        MarkEligibility::OpenOrPending => &[SignalStatus::Open, SignalStatus::Pending],
    }
}

fn storage_failure(action: &str, e: DatabaseError) -> (Outcome, String) {
    error!(action, "Storage failure: {e}");
    (Outcome::StorageFailed, replies::storage_failed(action))
}
