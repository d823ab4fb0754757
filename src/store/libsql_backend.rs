//! libSQL backend: async `SignalStore` implementation.
//!
//! Supports local file and in-memory databases. Prices are stored as TEXT so
//! decimal values round-trip exactly.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::signal::{NewSignal, SignalId, SignalPatch, SignalRecord, SignalStatus};
use crate::store::migrations;
use crate::store::traits::SignalStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Signal database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_records(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        op: &str,
    ) -> Result<Vec<SignalRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut records = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => records.push(row_to_signal(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("{op} row read: {e}"))),
            }
        }
        Ok(records)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format for timestamps. Fixed width, so TEXT ordering
/// matches time ordering.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_decimal(column: &str, s: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(s)
        .map_err(|e| DatabaseError::Serialization(format!("{column} '{s}' is not a decimal: {e}")))
}

fn parse_enum<T: FromStr<Err = String>>(s: &str) -> Result<T, DatabaseError> {
    s.parse().map_err(DatabaseError::Serialization)
}

/// Convert `Option<Decimal>` to libsql Value.
fn opt_decimal(d: Option<Decimal>) -> libsql::Value {
    match d {
        Some(d) => libsql::Value::Text(d.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// `'open','pending'` for an `IN (...)` clause. Values come from the enum,
/// never from user input.
fn status_list(statuses: &[SignalStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

const SIGNAL_COLUMNS: &str =
    "id, symbol, side, order_kind, entry, sl, tp, status, result, raw_text, created_at, updated_at";

/// Map a libsql Row to a SignalRecord.
///
/// Column order matches SIGNAL_COLUMNS:
/// 0:id, 1:symbol, 2:side, 3:order_kind, 4:entry, 5:sl, 6:tp, 7:status,
/// 8:result, 9:raw_text, 10:created_at, 11:updated_at
fn row_to_signal(row: &libsql::Row) -> Result<SignalRecord, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("signal row parse: {e}"));

    let id: i64 = row.get(0).map_err(read)?;
    let symbol: String = row.get(1).map_err(read)?;
    let side: String = row.get(2).map_err(read)?;
    let order_kind: String = row.get(3).map_err(read)?;
    let entry: String = row.get(4).map_err(read)?;
    let sl: Option<String> = row.get(5).ok();
    let tp: Option<String> = row.get(6).ok();
    let status: String = row.get(7).map_err(read)?;
    let result: Option<String> = row.get(8).ok();
    let raw_text: String = row.get(9).map_err(read)?;
    let created_at: String = row.get(10).map_err(read)?;
    let updated_at: Option<String> = row.get(11).ok();

    Ok(SignalRecord {
        id: SignalId(id),
        symbol,
        side: parse_enum(&side)?,
        order_kind: parse_enum(&order_kind)?,
        entry: parse_decimal("entry", &entry)?,
        stop_loss: sl.as_deref().map(|s| parse_decimal("sl", s)).transpose()?,
        take_profit: tp.as_deref().map(|s| parse_decimal("tp", s)).transpose()?,
        status: parse_enum(&status)?,
        result: result.as_deref().map(parse_enum).transpose()?,
        raw_text,
        created_at: parse_datetime(&created_at),
        updated_at: updated_at.as_deref().map(parse_datetime),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl SignalStore for LibSqlStore {
    async fn insert_signal(&self, signal: &NewSignal) -> Result<SignalRecord, DatabaseError> {
        let records = self
            .query_records(
                &format!(
                    "INSERT INTO signals (symbol, side, order_kind, entry, sl, tp, status, raw_text, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     RETURNING {SIGNAL_COLUMNS}"
                ),
                params![
                    signal.symbol.as_str(),
                    signal.side.as_str(),
                    signal.order_kind.as_str(),
                    signal.entry.to_string(),
                    opt_decimal(signal.stop_loss),
                    opt_decimal(signal.take_profit),
                    signal.status.as_str(),
                    signal.raw_text.as_str(),
                    now_timestamp(),
                ],
                "insert_signal",
            )
            .await?;

        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Query("insert_signal: no row returned".into()))?;

        debug!(signal_id = %record.id, symbol = %record.symbol, "Signal inserted");
        Ok(record)
    }

    async fn latest_signal(
        &self,
        statuses: Option<&[SignalStatus]>,
    ) -> Result<Option<SignalRecord>, DatabaseError> {
        let filter = match statuses {
            Some([]) => return Ok(None),
            Some(statuses) => format!("WHERE status IN ({})", status_list(statuses)),
            None => String::new(),
        };

        let records = self
            .query_records(
                &format!(
                    "SELECT {SIGNAL_COLUMNS} FROM signals {filter}
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                (),
                "latest_signal",
            )
            .await?;
        Ok(records.into_iter().next())
    }

    async fn update_signal(&self, id: SignalId, patch: &SignalPatch) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE signals
                 SET status = COALESCE(?2, status),
                     result = COALESCE(?3, result),
                     updated_at = ?4
                 WHERE id = ?1",
                params![
                    id.0,
                    opt_text(patch.status.map(|s| s.as_str())),
                    opt_text(patch.result.map(|r| r.as_str())),
                    now_timestamp(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_signal: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "signal".into(),
                id: id.to_string(),
            });
        }
        debug!(signal_id = %id, status = ?patch.status, result = ?patch.result, "Signal updated");
        Ok(())
    }

    async fn delete_signal(&self, id: SignalId) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM signals WHERE id = ?1", params![id.0])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_signal: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "signal".into(),
                id: id.to_string(),
            });
        }
        debug!(signal_id = %id, "Signal deleted");
        Ok(())
    }

    async fn get_signal(&self, id: SignalId) -> Result<Option<SignalRecord>, DatabaseError> {
        let records = self
            .query_records(
                &format!("SELECT {SIGNAL_COLUMNS} FROM signals WHERE id = ?1"),
                params![id.0],
                "get_signal",
            )
            .await?;
        Ok(records.into_iter().next())
    }

    async fn recent_signals(&self, limit: usize) -> Result<Vec<SignalRecord>, DatabaseError> {
        self.query_records(
            &format!(
                "SELECT {SIGNAL_COLUMNS} FROM signals
                 ORDER BY created_at DESC, id DESC LIMIT ?1"
            ),
            params![limit as i64],
            "recent_signals",
        )
        .await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("health_check: {e}")))?;
        Ok(())
    }
}
