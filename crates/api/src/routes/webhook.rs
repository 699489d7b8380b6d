//! Inbound webhook endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::response::webhook_reply;
use crate::state::AppState;

/// POST /webhook -- run the generation pipeline for one delivery.
///
/// The body is accepted as raw JSON; shape recognition happens inside the
/// trigger detector, not at the extractor (the workflow service sends
/// several payload variants down the same hook).
async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let result = state.orchestrator.handle_webhook(&payload).await;
    let (status, body) = webhook_reply(&result);
    (status, Json(body))
}

/// Mount the webhook route.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}
