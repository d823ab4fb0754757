//! HTTP surface: the Telegram webhook plus health and listing endpoints.
//!
//! The webhook always answers `200 {"ok": true}`, including for payloads it
//! cannot parse, so the Bot API never redelivers an update.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::channels::Update;
use crate::pipeline::SignalProcessor;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

#[derive(Clone)]
struct AppState {
    processor: Arc<SignalProcessor>,
}

/// Build the application router.
pub fn routes(processor: Arc<SignalProcessor>) -> Router {
    let state = AppState { processor };

    Router::new()
        .route("/telegram/webhook", post(telegram_webhook).get(webhook_ack))
        .route("/health", get(health))
        .route("/api/signals", get(list_signals))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn ack() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}

// ── Webhook ─────────────────────────────────────────────────────────

async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(bytes = body.len(), "Ignoring malformed webhook payload: {e}");
            return ack();
        }
    };

    let update_id = update.update_id;
    let Some(inbound) = update.into_inbound() else {
        debug!(update_id, "Update carries no message");
        return ack();
    };

    let outcome = state.processor.handle(inbound).await;
    debug!(update_id, outcome = outcome.label(), "Update handled");
    ack()
}

/// Non-POST requests are acknowledged without processing.
async fn webhook_ack() -> impl IntoResponse {
    ack()
}

// ── Health ──────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.processor.store().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "signal-ledger"
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "error": e.to_string()
                })),
            )
        }
    }
}

// ── Listing ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

async fn list_signals(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let limit = clamp_limit(params.limit);
    match state.processor.store().recent_signals(limit).await {
        Ok(records) => (StatusCode::OK, Json(serde_json::json!(records))),
        Err(e) => {
            warn!("Listing signals failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
