//! Signal text interpretation: normalization, extraction and command
//! classification.

pub mod command;
pub mod extract;
pub mod model;
pub mod normalize;

pub use command::{CommandClassifier, CommandIntent, classify};
pub use extract::{
    CompactStrategy, ExtractionStrategy, KeywordStrategy, PositionalStrategy, SignalDraft,
    SignalExtractor,
};
pub use model::{
    NewSignal, OrderKind, Side, SignalCandidate, SignalId, SignalPatch, SignalRecord,
    SignalResult, SignalStatus,
};
pub use normalize::{NormalizedText, normalize};
