use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health -- liveness probe. Always `{ok: true}`; the bridge holds no
/// local state whose health could degrade.
async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Mount the health route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
