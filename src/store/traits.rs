//! `SignalStore` trait: the storage collaborator seen by the lifecycle
//! manager.
//!
//! Backends must order records by creation time (identity breaks ties) and
//! support point updates by identity. "Most recent" is always resolved by
//! one query with `LIMIT 1`; callers never sort records in memory.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::signal::{NewSignal, SignalId, SignalPatch, SignalRecord, SignalStatus};

/// Backend-agnostic signal record store.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Insert a record. Identity and `created_at` are assigned by the store.
    async fn insert_signal(&self, signal: &NewSignal) -> Result<SignalRecord, DatabaseError>;

    /// Most recently created record, optionally restricted to `statuses`.
    async fn latest_signal(
        &self,
        statuses: Option<&[SignalStatus]>,
    ) -> Result<Option<SignalRecord>, DatabaseError>;

    /// Apply a partial update. `NotFound` when no record has this identity.
    async fn update_signal(&self, id: SignalId, patch: &SignalPatch) -> Result<(), DatabaseError>;

    /// Remove a record. `NotFound` when no record has this identity.
    async fn delete_signal(&self, id: SignalId) -> Result<(), DatabaseError>;

    /// Fetch one record by identity.
    async fn get_signal(&self, id: SignalId) -> Result<Option<SignalRecord>, DatabaseError>;

    /// Newest records first, up to `limit`.
    async fn recent_signals(&self, limit: usize) -> Result<Vec<SignalRecord>, DatabaseError>;

    /// Connectivity check.
    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.recent_signals(1).await.map(|_| ())
    }
}
