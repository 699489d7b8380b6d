//! Edge-trigger detection for inbound webhook events.
//!
//! The workflow service delivers several payload shapes depending on the
//! event source (field-update webhook, batched change webhook, legacy flat
//! automation webhook). [`WebhookEvent::parse`] tries each known shape as a
//! distinct variant in priority order instead of probing with nested
//! optional chains; [`evaluate`] then turns the parsed signal into a
//! [`TriggerDecision`] for one monitored field.
//!
//! The edge rule: fire only on a not-affirmative -> affirmative transition
//! of the monitored field, never on mere observation of the affirmative
//! state (that would regenerate a document on every webhook redelivery).

use serde_json::Value;

use crate::fields::is_affirmative;

/// One reported field change: identity plus previous/new values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field_id: String,
    /// Previous value; absent on shapes that do not report it. An absent
    /// previous value counts as not affirmative for edge detection.
    pub previous: Option<Value>,
    pub new: Value,
}

/// The recognized webhook payload shapes, in parse priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerSignal {
    /// A single field update with previous/new values.
    FieldUpdate(FieldChange),
    /// A batch of field changes; scanned for the monitored field.
    FieldChanges(Vec<FieldChange>),
    /// A flat action/value shape carrying only the new value.
    DirectValue(Value),
    /// None of the known shapes matched; the caller falls back to a fresh
    /// read of the card state.
    Unrecognized,
}

/// Parsed inbound webhook event. Transient; lives for one request.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Card identity, when the payload carries one.
    pub card_id: Option<String>,
    /// The strongest signal the payload shape yields.
    pub signal: TriggerSignal,
}

/// Outcome of evaluating a parsed event against the monitored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// A not-affirmative -> affirmative edge on the monitored field.
    Fire,
    /// The payload was understood and this event should not trigger.
    Skip,
    /// The payload alone cannot decide; check current card state.
    Unknown,
}

impl WebhookEvent {
    /// Parse a raw webhook body into the first matching known shape.
    pub fn parse(payload: &Value) -> Self {
        let card_id = extract_card_id(payload);
        let data = payload.get("data").unwrap_or(payload);

        // Shape 1: single field update with previous/new values.
        if let Some(change) = parse_field_change(data) {
            return Self {
                card_id,
                signal: TriggerSignal::FieldUpdate(change),
            };
        }

        // Shape 2: a collection of field changes.
        if let Some(changes) = data.get("changes").and_then(Value::as_array) {
            let parsed: Vec<FieldChange> =
                changes.iter().filter_map(parse_field_change).collect();
            return Self {
                card_id,
                signal: TriggerSignal::FieldChanges(parsed),
            };
        }

        // Shape 3: flat action + value (legacy automation webhook).
        if data.get("action").is_some() {
            if let Some(value) = data.get("value") {
                return Self {
                    card_id,
                    signal: TriggerSignal::DirectValue(value.clone()),
                };
            }
        }

        Self {
            card_id,
            signal: TriggerSignal::Unrecognized,
        }
    }
}

/// Decide whether a parsed signal should trigger generation for
/// `monitored_field`.
pub fn evaluate(signal: &TriggerSignal, monitored_field: &str) -> TriggerDecision {
    match signal {
        TriggerSignal::FieldUpdate(change) => {
            if change.field_id == monitored_field {
                edge_decision(change)
            } else {
                TriggerDecision::Skip
            }
        }
        TriggerSignal::FieldChanges(changes) => changes
            .iter()
            .find(|c| c.field_id == monitored_field)
            .map_or(TriggerDecision::Skip, edge_decision),
        TriggerSignal::DirectValue(value) => {
            if is_affirmative(value) {
                TriggerDecision::Fire
            } else {
                TriggerDecision::Skip
            }
        }
        TriggerSignal::Unrecognized => TriggerDecision::Unknown,
    }
}

fn edge_decision(change: &FieldChange) -> TriggerDecision {
    let was = change.previous.as_ref().is_some_and(is_affirmative);
    let now = is_affirmative(&change.new);
    if now && !was {
        TriggerDecision::Fire
    } else {
        TriggerDecision::Skip
    }
}

/// Parse one field-change entry: requires a field identity and a new value.
fn parse_field_change(entry: &Value) -> Option<FieldChange> {
    let field_id = entry
        .get("field")
        .and_then(|f| f.get("id"))
        .or_else(|| entry.get("field_id"))
        .and_then(value_as_id)?;
    let new = entry.get("new_value")?.clone();
    let previous = entry.get("previous_value").cloned().filter(|v| !v.is_null());
    Some(FieldChange {
        field_id,
        previous,
        new,
    })
}

/// Pull the card identity out of any of the known payload locations.
///
/// Identities arrive as numbers or strings depending on the webhook shape;
/// both normalize to a string.
pub fn extract_card_id(payload: &Value) -> Option<String> {
    let data = payload.get("data").unwrap_or(payload);
    data.get("card")
        .and_then(|c| c.get("id"))
        .or_else(|| {
            data.get("action")
                .and_then(|a| a.get("card"))
                .and_then(|c| c.get("id"))
        })
        .or_else(|| data.get("card_id"))
        .and_then(value_as_id)
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
