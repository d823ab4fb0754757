//! Signal domain types: parser output and the persisted record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Execution style of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Immediate execution. Used when no qualifier word is present.
    #[default]
    Market,
    Limit,
    Stop,
}

impl OrderKind {
    /// Storage form (`market`, `limit`, `stop`).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "market",
            OrderKind::Limit => "limit",
            OrderKind::Stop => "stop",
        }
    }

    /// Display form used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
            OrderKind::Stop => "STOP",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderKind::Market),
            "limit" => Ok(OrderKind::Limit),
            "stop" => Ok(OrderKind::Stop),
            other => Err(format!("unknown order kind: {other}")),
        }
    }
}

/// Lifecycle status of a persisted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    /// Market order, live.
    Open,
    /// Limit/stop order waiting to trigger.
    Pending,
    Closed,
    Cancelled,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Open => "open",
            SignalStatus::Pending => "pending",
            SignalStatus::Closed => "closed",
            SignalStatus::Cancelled => "cancelled",
        }
    }

    /// Closed and cancelled records never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalStatus::Closed | SignalStatus::Cancelled)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SignalStatus::Open),
            "pending" => Ok(SignalStatus::Pending),
            "closed" => Ok(SignalStatus::Closed),
            "cancelled" => Ok(SignalStatus::Cancelled),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Outcome attached to a terminal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalResult {
    Win,
    Loss,
    Cancelled,
}

impl SignalResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalResult::Win => "win",
            SignalResult::Loss => "loss",
            SignalResult::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SignalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(SignalResult::Win),
            "loss" => Ok(SignalResult::Loss),
            "cancelled" => Ok(SignalResult::Cancelled),
            other => Err(format!("unknown result: {other}")),
        }
    }
}

/// A fully validated signal extracted from one message.
///
/// Only produced when the active completeness policy is satisfied, so
/// `stop_loss`/`take_profit` are `None` only under the lenient policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub side: Side,
    pub order_kind: OrderKind,
    pub symbol: String,
    pub entry: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// Original message text, unmodified.
    pub raw_text: String,
}

impl SignalCandidate {
    /// Status a freshly recorded signal starts in.
    pub fn initial_status(&self) -> SignalStatus {
        match self.order_kind {
            OrderKind::Market => SignalStatus::Open,
            OrderKind::Limit | OrderKind::Stop => SignalStatus::Pending,
        }
    }
}

/// Storage-assigned identity. Increases with creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub i64);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row to insert. Column names match the persisted schema.
#[derive(Debug, Clone, Serialize)]
pub struct NewSignal {
    pub symbol: String,
    pub side: Side,
    pub order_kind: OrderKind,
    pub entry: Decimal,
    #[serde(rename = "sl")]
    pub stop_loss: Option<Decimal>,
    #[serde(rename = "tp")]
    pub take_profit: Option<Decimal>,
    pub status: SignalStatus,
    pub raw_text: String,
}

impl From<&SignalCandidate> for NewSignal {
    fn from(candidate: &SignalCandidate) -> Self {
        Self {
            symbol: candidate.symbol.clone(),
            side: candidate.side,
            order_kind: candidate.order_kind,
            entry: candidate.entry,
            stop_loss: candidate.stop_loss,
            take_profit: candidate.take_profit,
            status: candidate.initial_status(),
            raw_text: candidate.raw_text.clone(),
        }
    }
}

/// A persisted signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: SignalId,
    pub symbol: String,
    pub side: Side,
    pub order_kind: OrderKind,
    pub entry: Decimal,
    #[serde(rename = "sl")]
    pub stop_loss: Option<Decimal>,
    #[serde(rename = "tp")]
    pub take_profit: Option<Decimal>,
    pub status: SignalStatus,
    pub result: Option<SignalResult>,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update applied by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SignalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SignalResult>,
}

impl SignalPatch {
    /// Close a live record as a win or a loss.
    pub fn close(result: SignalResult) -> Self {
        Self {
            status: Some(SignalStatus::Closed),
            result: Some(result),
        }
    }

    /// Soft-cancel a record.
    pub fn cancel() -> Self {
        Self {
            status: Some(SignalStatus::Cancelled),
            result: Some(SignalResult::Cancelled),
        }
    }
}
