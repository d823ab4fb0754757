//! Text canonicalization applied before any pattern matching.
//!
//! The normalized form is uppercase and single-spaced, with underscores and
//! non-decimal commas turned into spaces and decimal commas turned into
//! decimal points. `SELL_LIMIT` and `SELL LIMIT` become the same tokens, and
//! so do `4042,7` and `4042.7`.

use std::fmt;
use std::ops::Deref;

/// Canonical form of one inbound message. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw message text. Total and idempotent.
pub fn normalize(raw: &str) -> NormalizedText {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '_' => out.push(' '),
            ',' => {
                let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_digit = chars.get(i + 1).is_some_and(char::is_ascii_digit);
                out.push(if prev_digit && next_digit { '.' } else { ' ' });
            }
            c => out.push(c),
        }
    }

    let upper = out.to_uppercase();
    NormalizedText(upper.split_whitespace().collect::<Vec<_>>().join(" "))
}
