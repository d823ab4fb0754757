//! Lifecycle command recognition.
//!
//! Commands are whole-message phrases. Matching is exact on the normalized
//! text after stripping surrounding punctuation, so signal text that merely
//! contains `STOP` or `HIT` is never taken for a command.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use crate::signal::normalize::{NormalizedText, normalize};

/// What a short command asks the lifecycle manager to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIntent {
    /// Cancel the most recent record, whatever its status.
    CancelLast,
    /// Close the most recent eligible record as a win.
    MarkWin,
    /// Close the most recent eligible record as a loss.
    MarkLoss,
    /// Reply with usage help.
    Start,
    /// Not a command; try signal extraction.
    None,
}

/// Fixed phrase vocabulary, extendable with deployment-specific START aliases.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    phrases: HashMap<String, CommandIntent>,
}

impl Default for CommandClassifier {
    fn default() -> Self {
        let phrases = [
            ("CANCELLA", CommandIntent::CancelLast),
            ("CANCEL", CommandIntent::CancelLast),
            ("HIT", CommandIntent::MarkWin),
            ("TP HIT", CommandIntent::MarkWin),
            ("STOP HIT", CommandIntent::MarkLoss),
            ("SL HIT", CommandIntent::MarkLoss),
            ("/START", CommandIntent::Start),
        ]
        .into_iter()
        .map(|(phrase, intent)| (phrase.to_string(), intent))
        .collect();

        Self { phrases }
    }
}

impl CommandClassifier {
    /// Default vocabulary plus extra START aliases (`/HELP`, `AIUTO`, ...).
    pub fn with_start_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classifier = Self::default();
        for alias in aliases {
            let alias = normalize(alias.as_ref());
            if !alias.is_empty() {
                classifier
                    .phrases
                    .insert(alias.to_string(), CommandIntent::Start);
            }
        }
        classifier
    }

    pub fn classify(&self, normalized: &NormalizedText) -> CommandIntent {
        let core = normalized.trim_matches(|c: char| !c.is_alphanumeric() && c != '/');

        // Bot commands may carry arguments or a bot suffix: `/START@MY BOT`.
        let key = if core.starts_with('/') {
            core.split([' ', '@']).next().unwrap_or(core)
        } else {
            core
        };

        self.phrases
            .get(key)
            .copied()
            .unwrap_or(CommandIntent::None)
    }
}

static DEFAULT_CLASSIFIER: LazyLock<CommandClassifier> = LazyLock::new(CommandClassifier::default);

/// Classify with the default vocabulary.
pub fn classify(normalized: &NormalizedText) -> CommandIntent {
    DEFAULT_CLASSIFIER.classify(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(raw: &str) -> CommandIntent {
        classify(&normalize(raw))
    }

    #[test]
    fn cancel_phrases() {
        assert_eq!(intent("cancella"), CommandIntent::CancelLast);
        assert_eq!(intent("Cancel"), CommandIntent::CancelLast);
    }

    #[test]
    fn win_phrases() {
        assert_eq!(intent("hit"), CommandIntent::MarkWin);
        assert_eq!(intent("tp hit"), CommandIntent::MarkWin);
        assert_eq!(intent("TP_HIT"), CommandIntent::MarkWin);
    }

    #[test]
    fn loss_phrases() {
        assert_eq!(intent("stop hit"), CommandIntent::MarkLoss);
        assert_eq!(intent("SL hit"), CommandIntent::MarkLoss);
        assert_eq!(intent("  stop\n hit "), CommandIntent::MarkLoss);
    }

    #[test]
    fn start_command_with_bot_suffix_and_args() {
        assert_eq!(intent("/start"), CommandIntent::Start);
        assert_eq!(intent("/start@signal_ledger_bot"), CommandIntent::Start);
        assert_eq!(intent("/start hello"), CommandIntent::Start);
    }

    #[test]
    fn surrounding_punctuation_is_ignored() {
        assert_eq!(intent("Hit!"), CommandIntent::MarkWin);
        assert_eq!(intent("tp hit ✅"), CommandIntent::MarkWin);
        assert_eq!(intent("cancel."), CommandIntent::CancelLast);
    }

    #[test]
    fn signal_text_is_not_a_command() {
        assert_eq!(intent("buy xauusd 100 sl 90 tp 110"), CommandIntent::None);
        assert_eq!(intent("Sell stop xauusd\nEntry4040\nSL4050\nTP4030"), CommandIntent::None);
        assert_eq!(intent("stop"), CommandIntent::None);
        assert_eq!(intent("stop hit now please"), CommandIntent::None);
        assert_eq!(intent("cancel the last one"), CommandIntent::None);
        assert_eq!(intent(""), CommandIntent::None);
    }

    #[test]
    fn start_aliases_extend_vocabulary() {
        let classifier = CommandClassifier::with_start_aliases(["/help", "aiuto"]);
        assert_eq!(classifier.classify(&normalize("/help")), CommandIntent::Start);
        assert_eq!(classifier.classify(&normalize("Aiuto")), CommandIntent::Start);
        assert_eq!(classifier.classify(&normalize("hit")), CommandIntent::MarkWin);
        assert_eq!(intent("/help"), CommandIntent::None);
    }
}
