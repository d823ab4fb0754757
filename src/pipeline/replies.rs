//! Reply texts sent back to the originating chat.
//!
//! Prices are echoed with `Decimal`'s own formatting so the confirmation
//! shows exactly what was stored.

use rust_decimal::Decimal;

use crate::config::{CompletenessPolicy, ParserConfig};
use crate::signal::{SignalRecord, SignalResult};

const MISSING_PRICE: &str = "n/a";

fn price(value: Option<Decimal>) -> String {
    value.map_or_else(|| MISSING_PRICE.to_string(), |v| v.to_string())
}

/// `BUY LIMIT XAUUSD`
fn headline(record: &SignalRecord) -> String {
    format!(
        "{} {} {}",
        record.side,
        record.order_kind.label(),
        record.symbol
    )
}

pub fn help(parser: &ParserConfig) -> String {
    let instruments = parser.instruments.symbols().join(", ");
    let default = match parser.instruments.default_symbol() {
        Some(symbol) => format!("Messages without an instrument are recorded as {symbol}.\n"),
        None => "Every signal must name its instrument.\n".to_string(),
    };
    let levels = match parser.completeness {
        CompletenessPolicy::Strict => "Entry, SL and TP are all required.\n",
        CompletenessPolicy::Lenient => "Entry is required; SL and TP may be omitted.\n",
    };

    format!(
        "👋 Forward your trading signals here.\n\
         Instruments: {instruments}\n\
         {default}\
         {levels}\n\
         Recognized formats:\n\
         • SELL_LIMIT XAUUSD 4050 SL 4060 TP 4042.7\n\
         • Buy limit xauusd 4005 SL3995 TP4035\n\
         • Sell stop xauusd / Entry4040 / SL4050 / TP4030 (one per line)\n\n\
         Commands:\n\
         • 'cancel' or 'cancella': cancel the latest signal\n\
         • 'hit' or 'tp hit': close the latest open signal as a win\n\
         • 'stop hit' or 'sl hit': close the latest open signal as a loss"
    )
}

pub fn recorded(record: &SignalRecord) -> String {
    format!(
        "✅ Signal #{} recorded:\n{}\nEntry: {}\nSL: {} · TP: {}",
        record.id,
        headline(record),
        record.entry,
        price(record.stop_loss),
        price(record.take_profit),
    )
}

pub fn not_recognized(raw_text: &str) -> String {
    format!("⚠️ Not recognized as a signal.\n\nReceived text:\n{raw_text}")
}

pub fn cancelled(record: &SignalRecord) -> String {
    format!(
        "✅ Signal #{} cancelled ({} @ {}).",
        record.id,
        headline(record),
        record.entry
    )
}

pub fn deleted(record: &SignalRecord) -> String {
    format!(
        "🗑️ Signal #{} deleted ({} @ {}).",
        record.id,
        headline(record),
        record.entry
    )
}

pub fn nothing_to_cancel() -> String {
    "ℹ️ No signal to cancel.".to_string()
}

pub fn already_final(record: &SignalRecord) -> String {
    format!(
        "ℹ️ Latest signal #{} is already {}; nothing to cancel.",
        record.id, record.status
    )
}

pub fn marked(record: &SignalRecord, result: SignalResult) -> String {
    let label = match result {
        SignalResult::Win => "win ✅",
        SignalResult::Loss => "loss ❌",
        SignalResult::Cancelled => "cancelled",
    };
    format!(
        "📊 Signal #{} ({} @ {}) closed as {label}.",
        record.id,
        headline(record),
        record.entry
    )
}

pub fn nothing_open() -> String {
    "ℹ️ No open signal to update.".to_string()
}

/// `action` completes "Internal error while ...".
pub fn storage_failed(action: &str) -> String {
    format!("❌ Internal error while {action}. Please try again.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{OrderKind, Side, SignalId, SignalStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record() -> SignalRecord {
        SignalRecord {
            id: SignalId(3),
            symbol: "XAUUSD".into(),
            side: Side::Sell,
            order_kind: OrderKind::Limit,
            entry: dec!(4050.00),
            stop_loss: Some(dec!(4060)),
            take_profit: None,
            status: SignalStatus::Pending,
            result: None,
            raw_text: "SELL_LIMIT XAUUSD 4050,00 SL 4060".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn recorded_echoes_exact_values() {
        let text = recorded(&record());
        assert!(text.contains("#3"));
        assert!(text.contains("SELL LIMIT XAUUSD"));
        assert!(text.contains("Entry: 4050.00"));
        assert!(text.contains("SL: 4060 · TP: n/a"));
    }

    #[test]
    fn not_recognized_echoes_raw_text() {
        let text = not_recognized("hello\nworld");
        assert!(text.ends_with("hello\nworld"));
    }

    #[test]
    fn marked_labels_result() {
        assert!(marked(&record(), SignalResult::Win).contains("win"));
        assert!(marked(&record(), SignalResult::Loss).contains("loss"));
    }

    #[test]
    fn already_final_names_status() {
        let mut r = record();
        r.status = SignalStatus::Closed;
        assert!(already_final(&r).contains("already closed"));
    }

    #[test]
    fn help_lists_instruments_and_policy() {
        let text = help(&ParserConfig::default());
        assert!(text.contains("EURUSD, XAGUSD, XAUUSD"));
        assert!(text.contains("recorded as XAUUSD"));
        assert!(text.contains("Entry, SL and TP are all required"));
        assert!(text.contains("stop hit"));
    }
}
