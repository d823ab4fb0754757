//! Signal Ledger: records trading signals posted to a chat and tracks
//! their outcome.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod signal;
pub mod store;
