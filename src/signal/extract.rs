//! Signal extraction: an ordered cascade of pattern strategies.
//!
//! Strategies run in order against the normalized text:
//! 1. [`CompactStrategy`]: `<SIDE> [LIMIT|STOP] <SYMBOL> <N> SL <N> TP <N>`
//! 2. [`KeywordStrategy`]: side, qualifier, instrument and `ENTRY`/`SL`/`TP`
//!    prefixed numbers found anywhere
//! 3. [`PositionalStrategy`]: keyword results, with missing prices filled
//!    from bare numbers (first the one after the instrument, then in order)
//!
//! Each strategy yields a [`SignalDraft`]; the first draft that satisfies the
//! completeness policy becomes the [`SignalCandidate`]. Partial drafts never
//! leave this module.

use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{CompletenessPolicy, InstrumentTable, ParserConfig};
use crate::signal::model::{OrderKind, Side, SignalCandidate};
use crate::signal::normalize::NormalizedText;

const NUM: &str = r"(\d+(?:\.\d+)?)";

static SIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(BUY|SELL)\b").expect("side regex"));

static QUALIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(LIMIT|STOP|NOW)\b").expect("qualifier regex"));

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\bENTRY[ :]*{NUM}")).expect("entry regex"));

/// Single-digit level index on a price label (`TP1 3300`, `SL2: 3280`).
/// A longer glued number (`TP3305`) is the price itself.
const LEVEL_INDEX: &str = r"(?:\d\b)?";

static SL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:SL|STOP LOSS|STOPLOSS){LEVEL_INDEX}[ :]*{NUM}")).expect("sl regex")
});

static TP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:TP|TAKE PROFIT|TAKEPROFIT){LEVEL_INDEX}[ :]*{NUM}"))
        .expect("tp regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex"));

/// Fields a strategy managed to locate. Anything may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalDraft {
    /// Name of the strategy that produced this draft.
    pub strategy: &'static str,
    pub side: Option<Side>,
    pub order_kind: OrderKind,
    pub symbol: Option<String>,
    pub entry: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl SignalDraft {
    /// Promote to a candidate if the policy is satisfied.
    ///
    /// Side, symbol and entry are always required. Every price present must
    /// be strictly positive; a zero is a parsed value, not an absent one, so
    /// it invalidates the draft rather than being skipped.
    pub fn finish(self, policy: CompletenessPolicy, raw_text: &str) -> Option<SignalCandidate> {
        let side = self.side?;
        let symbol = self.symbol?;
        let entry = self.entry?;

        if policy == CompletenessPolicy::Strict
            && (self.stop_loss.is_none() || self.take_profit.is_none())
        {
            return None;
        }

        let prices = [Some(entry), self.stop_loss, self.take_profit];
        if prices.iter().flatten().any(|p| *p <= Decimal::ZERO) {
            return None;
        }

        Some(SignalCandidate {
            side,
            order_kind: self.order_kind,
            symbol,
            entry,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            raw_text: raw_text.to_string(),
        })
    }
}

/// One structural interpretation of a message.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Try to interpret the text. `None` means the shape did not match.
    fn attempt(&self, text: &NormalizedText) -> Option<SignalDraft>;
}

// ── Shared matchers ─────────────────────────────────────────────────

fn parse_price(token: &str) -> Option<Decimal> {
    Decimal::from_str(token).ok()
}

fn detect_side(text: &str) -> Option<Side> {
    SIDE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// LIMIT anywhere wins over STOP; NOW or nothing means market.
/// `STOP LOSS` is a price label, not a qualifier.
fn detect_order_kind(text: &str) -> OrderKind {
    let mut kind = OrderKind::Market;
    for m in QUALIFIER_RE.find_iter(text) {
        match m.as_str() {
            "LIMIT" => return OrderKind::Limit,
            "STOP" if !text[m.end()..].starts_with(" LOSS") => kind = OrderKind::Stop,
            _ => {}
        }
    }
    kind
}

/// Matches the first keyword-prefixed number, returning its value and span.
fn keyword_price(re: &Regex, text: &str) -> Option<(Option<Decimal>, Range<usize>)> {
    let caps = re.captures(text)?;
    let m = caps.get(1)?;
    Some((parse_price(m.as_str()), m.range()))
}

/// Builds `(TOKEN|TOKEN|...)` from the instrument whitelist.
fn symbol_alternation(instruments: &InstrumentTable) -> Option<String> {
    let tokens = instruments.tokens();
    if tokens.is_empty() {
        return None;
    }
    let escaped: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
    Some(format!("({})", escaped.join("|")))
}

/// Locates whitelisted instrument tokens and resolves them.
#[derive(Debug, Clone)]
struct SymbolMatcher {
    instruments: InstrumentTable,
    re: Option<Regex>,
}

impl SymbolMatcher {
    fn new(instruments: InstrumentTable) -> Self {
        // The token must not run on into more letters; digits may follow
        // directly (`XAUUSD3290`).
        let re = symbol_alternation(&instruments)
            .and_then(|alt| Regex::new(&format!(r"\b{alt}(?:[^A-Z]|$)")).ok());
        Self { instruments, re }
    }

    /// Canonical symbol and the span of the matched token.
    fn locate(&self, text: &str) -> Option<(String, Range<usize>)> {
        let caps = self.re.as_ref()?.captures(text)?;
        let m = caps.get(1)?;
        let canonical = self.instruments.resolve(m.as_str())?;
        Some((canonical.to_string(), m.range()))
    }

    fn resolve(&self, token: &str) -> Option<String> {
        self.instruments.resolve(token).map(str::to_string)
    }

    fn default_symbol(&self) -> Option<String> {
        self.instruments.default_symbol().map(str::to_string)
    }
}

/// Output of the keyword scan, with the spans the prices were read from.
struct KeywordScan {
    draft: SignalDraft,
    symbol_end: Option<usize>,
    claimed: Vec<Range<usize>>,
}

fn keyword_scan(symbols: &SymbolMatcher, text: &str, strategy: &'static str) -> Option<KeywordScan> {
    let side = detect_side(text)?;
    let located = symbols.locate(text);
    let symbol_end = located.as_ref().map(|(_, span)| span.end);
    let symbol = located
        .map(|(symbol, _)| symbol)
        .or_else(|| symbols.default_symbol());

    let mut claimed = Vec::new();
    let mut price = |re: &Regex| {
        keyword_price(re, text).and_then(|(value, span)| {
            claimed.push(span);
            value
        })
    };
    let entry = price(&*ENTRY_RE);
    let stop_loss = price(&*SL_RE);
    let take_profit = price(&*TP_RE);

    Some(KeywordScan {
        draft: SignalDraft {
            strategy,
            side: Some(side),
            order_kind: detect_order_kind(text),
            symbol,
            entry,
            stop_loss,
            take_profit,
        },
        symbol_end,
        claimed,
    })
}

// ── Strategies ──────────────────────────────────────────────────────

/// `<SIDE> [LIMIT|STOP|NOW] <SYMBOL> <N> SL <N> TP <N>` on one line.
pub struct CompactStrategy {
    symbols: SymbolMatcher,
    re: Option<Regex>,
}

impl CompactStrategy {
    pub fn new(instruments: InstrumentTable) -> Self {
        let re = symbol_alternation(&instruments).and_then(|alt| {
            Regex::new(&format!(
                r"\b(BUY|SELL) (?:(LIMIT|STOP|NOW) )?{alt} ?(?:@ ?)?{NUM} (?:SL|STOP LOSS){LEVEL_INDEX}[ :]*{NUM} (?:TP|TAKE PROFIT){LEVEL_INDEX}[ :]*{NUM}"
            ))
            .ok()
        });
        Self {
            symbols: SymbolMatcher::new(instruments),
            re,
        }
    }
}

impl ExtractionStrategy for CompactStrategy {
    fn name(&self) -> &'static str {
        "compact"
    }

    fn attempt(&self, text: &NormalizedText) -> Option<SignalDraft> {
        let caps = self.re.as_ref()?.captures(text)?;

        // The compact shape only speaks for the message when it starts at
        // the first side token.
        let side_token = caps.get(1)?;
        if SIDE_RE.find(text).map(|m| m.start()) != Some(side_token.start()) {
            return None;
        }
        let side = side_token.as_str().parse().ok()?;
        let order_kind = match caps.get(2).map(|m| m.as_str()) {
            Some("LIMIT") => OrderKind::Limit,
            Some("STOP") => OrderKind::Stop,
            _ => OrderKind::Market,
        };

        Some(SignalDraft {
            strategy: self.name(),
            side: Some(side),
            order_kind,
            symbol: self.symbols.resolve(caps.get(3)?.as_str()),
            entry: parse_price(caps.get(4)?.as_str()),
            stop_loss: parse_price(caps.get(5)?.as_str()),
            take_profit: parse_price(caps.get(6)?.as_str()),
        })
    }
}

/// Side, qualifier, instrument and `ENTRY`/`SL`/`TP` numbers, each found
/// independently anywhere in the text.
pub struct KeywordStrategy {
    symbols: SymbolMatcher,
}

impl KeywordStrategy {
    pub fn new(instruments: InstrumentTable) -> Self {
        Self {
            symbols: SymbolMatcher::new(instruments),
        }
    }
}

impl ExtractionStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn attempt(&self, text: &NormalizedText) -> Option<SignalDraft> {
        keyword_scan(&self.symbols, text, self.name()).map(|scan| scan.draft)
    }
}

/// Keyword scan, then missing prices filled from bare numbers.
///
/// The entry prefers the first free number after the instrument token. Any
/// slot still empty takes the next free bare number in reading order
/// (entry, then SL, then TP). Numbers already read by a keyword, and numbers
/// glued to a preceding word (`H4`, `TP1`), are never reused.
pub struct PositionalStrategy {
    symbols: SymbolMatcher,
}

impl PositionalStrategy {
    pub fn new(instruments: InstrumentTable) -> Self {
        Self {
            symbols: SymbolMatcher::new(instruments),
        }
    }
}

impl ExtractionStrategy for PositionalStrategy {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn attempt(&self, text: &NormalizedText) -> Option<SignalDraft> {
        let scan = keyword_scan(&self.symbols, text, self.name())?;
        let mut draft = scan.draft;
        let text = text.as_str();

        let overlaps = |span: &Range<usize>| {
            scan.claimed
                .iter()
                .any(|c| span.start < c.end && c.start < span.end)
        };

        let mut free: Vec<(usize, Decimal)> = NUMBER_RE
            .find_iter(text)
            .filter(|m| !overlaps(&m.range()))
            .filter(|m| {
                let glued = text[..m.start()]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphabetic());
                !glued || Some(m.start()) == scan.symbol_end
            })
            .filter_map(|m| parse_price(m.as_str()).map(|v| (m.start(), v)))
            .collect();

        if draft.entry.is_none() {
            if let Some(symbol_end) = scan.symbol_end {
                if let Some(idx) = free.iter().position(|(start, _)| *start >= symbol_end) {
                    draft.entry = Some(free.remove(idx).1);
                }
            }
        }

        let mut remaining = free.into_iter().map(|(_, value)| value);
        for slot in [&mut draft.entry, &mut draft.stop_loss, &mut draft.take_profit] {
            if slot.is_none() {
                *slot = remaining.next();
            }
        }

        Some(draft)
    }
}

// ── Extractor ───────────────────────────────────────────────────────

/// Runs the strategy cascade under one completeness policy.
pub struct SignalExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    completeness: CompletenessPolicy,
}

impl SignalExtractor {
    /// Standard cascade: compact, keyword, positional.
    pub fn new(config: &ParserConfig) -> Self {
        let instruments = &config.instruments;
        Self {
            strategies: vec![
                Box::new(CompactStrategy::new(instruments.clone())),
                Box::new(KeywordStrategy::new(instruments.clone())),
                Box::new(PositionalStrategy::new(instruments.clone())),
            ],
            completeness: config.completeness,
        }
    }

    /// Custom cascade (tests, alternative deployments).
    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        completeness: CompletenessPolicy,
    ) -> Self {
        Self {
            strategies,
            completeness,
        }
    }

    /// Extract a signal, or `None` when the text is not a valid signal.
    pub fn extract(&self, normalized: &NormalizedText, raw_text: &str) -> Option<SignalCandidate> {
        if !SIDE_RE.is_match(normalized) {
            return None;
        }

        for strategy in &self.strategies {
            let Some(draft) = strategy.attempt(normalized) else {
                continue;
            };
            if let Some(candidate) = draft.clone().finish(self.completeness, raw_text) {
                debug!(strategy = strategy.name(), symbol = %candidate.symbol, "Signal extracted");
                return Some(candidate);
            }
            debug!(strategy = strategy.name(), ?draft, "Draft incomplete, trying next strategy");
        }

        None
    }
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::signal::normalize::normalize;

    fn extract(raw: &str) -> Option<SignalCandidate> {
        SignalExtractor::default().extract(&normalize(raw), raw)
    }

    fn lenient(raw: &str) -> Option<SignalCandidate> {
        let config = ParserConfig {
            completeness: CompletenessPolicy::Lenient,
            ..ParserConfig::default()
        };
        SignalExtractor::new(&config).extract(&normalize(raw), raw)
    }

    fn prices(c: &SignalCandidate) -> (Decimal, Option<Decimal>, Option<Decimal>) {
        (c.entry, c.stop_loss, c.take_profit)
    }

    // ── Cascade ─────────────────────────────────────────────────────

    #[test]
    fn sell_limit_with_underscore() {
        let raw = "SELL_LIMIT XAUUSD 4050 SL 4060 TP 4042.7";
        let c = extract(raw).unwrap();
        assert_eq!(c.side, Side::Sell);
        assert_eq!(c.order_kind, OrderKind::Limit);
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(4050), Some(dec!(4060)), Some(dec!(4042.7))));
        assert_eq!(c.raw_text, raw);
    }

    #[test]
    fn multiline_keywords_without_separator() {
        let c = extract("Buy limit xauusd\nEntry4005\nSL3995\nTP4035").unwrap();
        assert_eq!(c.side, Side::Buy);
        assert_eq!(c.order_kind, OrderKind::Limit);
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(4005), Some(dec!(3995)), Some(dec!(4035))));
    }

    #[test]
    fn market_order_without_qualifier() {
        let c = extract("BUY XAUUSD 3290 SL 3280 TP 3305").unwrap();
        assert_eq!(c.side, Side::Buy);
        assert_eq!(c.order_kind, OrderKind::Market);
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn sell_stop_multiline() {
        let c = extract("Sell stop xauusd\nEntry4040\nSL4050\nTP4030").unwrap();
        assert_eq!(c.side, Side::Sell);
        assert_eq!(c.order_kind, OrderKind::Stop);
        assert_eq!(prices(&c), (dec!(4040), Some(dec!(4050)), Some(dec!(4030))));
    }

    #[test]
    fn decimal_commas_are_prices() {
        let c = extract("sell xauusd 4042,5 sl 4050,25 tp 4030,1").unwrap();
        assert_eq!(prices(&c), (dec!(4042.5), Some(dec!(4050.25)), Some(dec!(4030.1))));
    }

    #[test]
    fn colon_separators_tolerated() {
        let c = extract("BUY EURUSD\nEntry: 1.0850\nSL: 1.0820\nTP: 1.0910").unwrap();
        assert_eq!(c.symbol, "EURUSD");
        assert_eq!(prices(&c), (dec!(1.0850), Some(dec!(1.0820)), Some(dec!(1.0910))));
    }

    #[test]
    fn now_means_market() {
        let c = extract("Gold buy now 2000 sl 1990 tp 2020").unwrap();
        assert_eq!(c.order_kind, OrderKind::Market);
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(2000), Some(dec!(1990)), Some(dec!(2020))));
    }

    #[test]
    fn stop_loss_phrase_is_not_a_stop_order() {
        let c = extract("BUY XAUUSD ENTRY 3290 STOP LOSS 3280 TAKE PROFIT 3305").unwrap();
        assert_eq!(c.order_kind, OrderKind::Market);
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn limit_wins_over_stop() {
        let c = extract("BUY LIMIT XAUUSD ENTRY 3290 SL 3280 TP 3305 stop").unwrap();
        assert_eq!(c.order_kind, OrderKind::Limit);
    }

    #[test]
    fn unknown_instrument_falls_back_to_default() {
        let c = extract("buy 2000 sl 1990 tp 2020").unwrap();
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(2000), Some(dec!(1990)), Some(dec!(2020))));
    }

    #[test]
    fn no_default_symbol_means_no_signal() {
        let config = ParserConfig {
            instruments: InstrumentTable::parse_list("EURUSD", None).unwrap(),
            completeness: CompletenessPolicy::Strict,
        };
        let extractor = SignalExtractor::new(&config);
        let raw = "BUY GBPUSD ENTRY 1.25 SL 1.24 TP 1.27";
        assert!(extractor.extract(&normalize(raw), raw).is_none());
    }

    #[test]
    fn alias_resolves_to_canonical() {
        let c = extract("SELL GOLD 2400 SL 2410 TP 2380").unwrap();
        assert_eq!(c.symbol, "XAUUSD");
    }

    #[test]
    fn first_side_token_wins() {
        let c = extract("SELL now, then BUY XAUUSD 3290 SL 3280 TP 3305").unwrap();
        assert_eq!(c.side, Side::Sell);
        assert_eq!(c.order_kind, OrderKind::Market);
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn numbered_targets_read_the_price_not_the_index() {
        let c = extract("BUY XAUUSD 3290 SL 3280 TP1 3300 TP2 3310").unwrap();
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3300))));

        let c = extract("BUY XAUUSD\nEntry 3290\nSL1: 3280\nTP1: 3300").unwrap();
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3300))));
    }

    #[test]
    fn configured_ticker_with_underscore_is_recognized() {
        let mut instruments = InstrumentTable::new(None);
        instruments.insert("XAU_USD");
        let config = ParserConfig {
            instruments,
            completeness: CompletenessPolicy::Strict,
        };
        let raw = "buy xau_usd 3290 sl 3280 tp 3305";
        let c = SignalExtractor::new(&config).extract(&normalize(raw), raw).unwrap();
        assert_eq!(c.symbol, "XAU_USD");
        assert_eq!(c.entry, dec!(3290));
    }

    // ── Positional fallback ─────────────────────────────────────────

    #[test]
    fn number_after_symbol_is_entry() {
        let c = extract("BUY XAUUSD 3290\nSL 3280\nTP 3305").unwrap();
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn symbol_glued_to_entry() {
        let c = extract("BUY XAUUSD3290 SL3280 TP3305").unwrap();
        assert_eq!(c.symbol, "XAUUSD");
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn three_bare_numbers_in_order() {
        let c = extract("sell xagusd\n31.20\n31.60\n30.50").unwrap();
        assert_eq!(c.symbol, "XAGUSD");
        assert_eq!(prices(&c), (dec!(31.20), Some(dec!(31.60)), Some(dec!(30.50))));
    }

    #[test]
    fn keyword_numbers_are_not_reused() {
        let c = extract("BUY XAUUSD SL 3280 3290 TP 3305").unwrap();
        assert_eq!(prices(&c), (dec!(3290), Some(dec!(3280)), Some(dec!(3305))));
    }

    #[test]
    fn glued_word_numbers_are_ignored() {
        let c = extract("BUY XAUUSD H4 3290 SL 3280 TP 3305").unwrap();
        assert_eq!(c.entry, dec!(3290));
    }

    // ── Rejections ──────────────────────────────────────────────────

    #[test]
    fn no_side_no_signal() {
        assert!(extract("XAUUSD 3290 SL 3280 TP 3305").is_none());
        assert!(extract("LIMIT XAUUSD ENTRY 1 SL 2 TP 3").is_none());
        assert!(extract("").is_none());
        assert!(extract("hello there").is_none());
    }

    #[test]
    fn side_must_be_a_whole_word() {
        assert!(extract("BUYING XAUUSD 3290 SL 3280 TP 3305").is_none());
    }

    #[test]
    fn strict_requires_sl_and_tp() {
        assert!(extract("BUY XAUUSD ENTRY 3290 SL 3280").is_none());
        assert!(extract("BUY XAUUSD").is_none());
    }

    #[test]
    fn lenient_allows_missing_sl_tp() {
        let c = lenient("BUY XAUUSD ENTRY 3290").unwrap();
        assert_eq!(prices(&c), (dec!(3290), None, None));
        assert!(lenient("BUY XAUUSD").is_none(), "entry is still required");
    }

    #[test]
    fn zero_price_is_invalid_not_absent() {
        assert!(extract("BUY XAUUSD 0 SL 3280 TP 3305").is_none());
        assert!(extract("BUY XAUUSD ENTRY 3290 SL 0 TP 3305").is_none());
    }

    #[test]
    fn overflowing_number_is_absent() {
        let huge = "9".repeat(40);
        let raw = format!("BUY XAUUSD ENTRY {huge} SL 3280 TP 3305");
        assert!(extract(&raw).is_none());
    }

    // ── Strategies in isolation ─────────────────────────────────────

    #[test]
    fn compact_strategy_matches_only_compact_shape() {
        let strategy = CompactStrategy::new(InstrumentTable::default());
        let draft = strategy
            .attempt(&normalize("SELL_LIMIT XAUUSD 4050 SL 4060 TP 4042.7"))
            .unwrap();
        assert_eq!(draft.strategy, "compact");
        assert_eq!(draft.order_kind, OrderKind::Limit);
        assert!(strategy.attempt(&normalize("Buy limit xauusd\nEntry4005\nSL3995\nTP4035")).is_none());
    }

    #[test]
    fn compact_strategy_skips_a_later_side_token() {
        let strategy = CompactStrategy::new(InstrumentTable::default());
        let text = normalize("SELL now, then BUY XAUUSD 3290 SL 3280 TP 3305");
        assert!(strategy.attempt(&text).is_none());
    }

    #[test]
    fn compact_strategy_requires_whitelisted_symbol() {
        let strategy = CompactStrategy::new(InstrumentTable::default());
        assert!(strategy.attempt(&normalize("BUY GBPJPY 190 SL 189 TP 192")).is_none());
    }

    #[test]
    fn keyword_strategy_leaves_unlabelled_prices_empty() {
        let strategy = KeywordStrategy::new(InstrumentTable::default());
        let draft = strategy.attempt(&normalize("BUY XAUUSD 3290 SL 3280 TP 3305")).unwrap();
        assert_eq!(draft.entry, None);
        assert_eq!(draft.stop_loss, Some(dec!(3280)));
        assert_eq!(draft.take_profit, Some(dec!(3305)));
    }

    #[test]
    fn positional_strategy_reports_its_name() {
        let strategy = PositionalStrategy::new(InstrumentTable::default());
        let draft = strategy.attempt(&normalize("BUY XAUUSD 1 2 3")).unwrap();
        assert_eq!(draft.strategy, "positional");
        assert_eq!(draft.entry, Some(dec!(1)));
    }

    #[test]
    fn cascade_stops_at_first_complete_draft() {
        struct Fixed(&'static str, Option<Decimal>);
        impl ExtractionStrategy for Fixed {
            fn name(&self) -> &'static str {
                self.0
            }
            fn attempt(&self, _text: &NormalizedText) -> Option<SignalDraft> {
                Some(SignalDraft {
                    strategy: self.0,
                    side: Some(Side::Buy),
                    symbol: Some("XAUUSD".into()),
                    entry: self.1,
                    stop_loss: Some(dec!(1)),
                    take_profit: Some(dec!(3)),
                    ..SignalDraft::default()
                })
            }
        }

        let extractor = SignalExtractor::with_strategies(
            vec![
                Box::new(Fixed("incomplete", None)),
                Box::new(Fixed("first", Some(dec!(2)))),
                Box::new(Fixed("second", Some(dec!(5)))),
            ],
            CompletenessPolicy::Strict,
        );
        let c = extractor.extract(&normalize("buy"), "buy").unwrap();
        assert_eq!(c.entry, dec!(2));
    }
}
