//! Message processing pipeline.
//!
//! Every inbound message flows through `SignalProcessor::handle()`:
//! normalize, classify as a command, otherwise extract a signal, then apply
//! the change to the store and send one reply.

pub mod processor;
pub mod replies;
pub mod types;

pub use processor::SignalProcessor;
pub use types::{InboundMessage, Outcome};
