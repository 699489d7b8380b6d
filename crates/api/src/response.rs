//! Webhook response envelope.
//!
//! Every outcome except a missing card identity answers `200` -- the
//! webhook sender retries non-2xx deliveries indefinitely, and most of our
//! failures (unmapped vault, bad template) are nothing a redelivery can
//! fix. The failure detail still travels in the body and the logs for
//! operator diagnosis.

use axum::http::StatusCode;
use serde_json::{json, Value};

use cardsign_core::{BridgeError, BridgeResult};
use cardsign_pipeline::RunOutcome;

/// Map an orchestrator result onto the `{ok: ...}` envelope and status.
pub fn webhook_reply(result: &BridgeResult<RunOutcome>) -> (StatusCode, Value) {
    match result {
        Ok(RunOutcome::Completed { document_id, link }) => (
            StatusCode::OK,
            json!({ "ok": true, "document_id": document_id, "link": link }),
        ),
        Ok(RunOutcome::AlreadyLinked) => (
            StatusCode::OK,
            json!({ "ok": true, "message": "already generated" }),
        ),
        Ok(RunOutcome::NotTriggered) => (
            StatusCode::OK,
            json!({ "ok": true, "message": "not triggered" }),
        ),
        Ok(RunOutcome::Busy) => (
            StatusCode::OK,
            json!({ "ok": true, "message": "processing already in progress" }),
        ),
        Err(err @ BridgeError::Input(_)) => (
            StatusCode::BAD_REQUEST,
            json!({ "ok": false, "error": err.to_string() }),
        ),
        Err(err) => (
            StatusCode::OK,
            json!({ "ok": false, "error": err.to_string() }),
        ),
    }
}
