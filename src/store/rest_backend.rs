//! Hosted record store over a PostgREST-style HTTP API (Supabase).
//!
//! Every request authenticates with the service key as both `apikey` and
//! bearer token. Writes ask for `return=representation` so the stored row
//! comes back in the response.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::RestStoreConfig;
use crate::error::DatabaseError;
use crate::signal::{NewSignal, SignalId, SignalPatch, SignalRecord, SignalStatus};
use crate::store::traits::SignalStore;

const NEWEST_FIRST: &str = "created_at.desc,id.desc";

/// `SignalStore` backed by a remote PostgREST table.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
    table: String,
}

impl RestStore {
    pub fn new(config: &RestStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            table: config.table.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        self.client
            .request(method, self.table_url())
            .header("apikey", key)
            .bearer_auth(key)
            .header("Accept", "application/json")
    }

    /// Send and decode a JSON array of rows.
    async fn rows(
        &self,
        request: RequestBuilder,
        op: &str,
    ) -> Result<Vec<SignalRecord>, DatabaseError> {
        let resp = request
            .send()
            .await
            .map_err(|e| DatabaseError::Request(format!("{op}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DatabaseError::Request(format!("{op} returned {status}: {body}")));
        }

        resp.json::<Vec<SignalRecord>>()
            .await
            .map_err(|e| DatabaseError::Serialization(format!("{op} response: {e}")))
    }

    fn not_found(id: SignalId) -> DatabaseError {
        DatabaseError::NotFound {
            entity: "signal".into(),
            id: id.to_string(),
        }
    }
}

// ── Query builders ──────────────────────────────────────────────────

fn id_filter(id: SignalId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

/// `in.(open,pending)`
fn status_filter(statuses: &[SignalStatus]) -> (&'static str, String) {
    let list = statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",");
    ("status", format!("in.({list})"))
}

fn latest_query(statuses: Option<&[SignalStatus]>) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", "*".to_string())];
    if let Some(statuses) = statuses {
        query.push(status_filter(statuses));
    }
    query.push(("order", NEWEST_FIRST.to_string()));
    query.push(("limit", "1".to_string()));
    query
}

fn recent_query(limit: usize) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("order", NEWEST_FIRST.to_string()),
        ("limit", limit.to_string()),
    ]
}

fn patch_body(patch: &SignalPatch) -> Result<serde_json::Value, DatabaseError> {
    let mut body = serde_json::to_value(patch)
        .map_err(|e| DatabaseError::Serialization(format!("update_signal body: {e}")))?;
    body["updated_at"] = serde_json::Value::String(Utc::now().to_rfc3339());
    Ok(body)
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl SignalStore for RestStore {
    async fn insert_signal(&self, signal: &NewSignal) -> Result<SignalRecord, DatabaseError> {
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&[signal]);

        let record = self
            .rows(request, "insert_signal")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Request("insert_signal: empty representation".into()))?;

        debug!(signal_id = %record.id, symbol = %record.symbol, "Signal inserted");
        Ok(record)
    }

    async fn latest_signal(
        &self,
        statuses: Option<&[SignalStatus]>,
    ) -> Result<Option<SignalRecord>, DatabaseError> {
        if matches!(statuses, Some([])) {
            return Ok(None);
        }
        let request = self.request(Method::GET).query(&latest_query(statuses));
        Ok(self.rows(request, "latest_signal").await?.into_iter().next())
    }

    async fn update_signal(&self, id: SignalId, patch: &SignalPatch) -> Result<(), DatabaseError> {
        let request = self
            .request(Method::PATCH)
            .header("Prefer", "return=representation")
            .query(&[id_filter(id)])
            .json(&patch_body(patch)?);

        if self.rows(request, "update_signal").await?.is_empty() {
            return Err(Self::not_found(id));
        }
        debug!(signal_id = %id, status = ?patch.status, result = ?patch.result, "Signal updated");
        Ok(())
    }

    async fn delete_signal(&self, id: SignalId) -> Result<(), DatabaseError> {
        let request = self
            .request(Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&[id_filter(id)]);

        if self.rows(request, "delete_signal").await?.is_empty() {
            return Err(Self::not_found(id));
        }
        debug!(signal_id = %id, "Signal deleted");
        Ok(())
    }

    async fn get_signal(&self, id: SignalId) -> Result<Option<SignalRecord>, DatabaseError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*".to_string()), id_filter(id)]);
        Ok(self.rows(request, "get_signal").await?.into_iter().next())
    }

    async fn recent_signals(&self, limit: usize) -> Result<Vec<SignalRecord>, DatabaseError> {
        let request = self.request(Method::GET).query(&recent_query(limit));
        self.rows(request, "recent_signals").await
    }
}
