//! Field-value normalization.
//!
//! Card field values arrive in several encodings depending on the field
//! type and the webhook shape: plain scalars, JSON arrays, booleans, and
//! JSON-encoded strings (a checkbox field reports `"[\"Sim\"]"` as a
//! string). [`normalize_field_value`] flattens all of these to a display
//! string with an explicit ordered list of recognized shapes;
//! [`is_affirmative`] decides the "checkbox is ticked" sense on top of it.

use serde_json::Value;

/// Case-insensitive tokens that normalize to the affirmative sense.
/// Covers the literal booleans plus the localized checkbox labels the
/// workflow service emits.
const YES_TOKENS: &[&str] = &["true", "yes", "sim", "checked"];

/// Flatten a field value to a plain string.
///
/// Recognized shapes, first match wins:
/// 1. JSON string that itself parses as a JSON array: decoded and the
///    elements joined with `", "`.
/// 2. Plain string: passed through.
/// 3. Array: elements normalized recursively and joined with `", "`.
/// 4. Boolean / number: canonical JSON text.
/// 5. Null: empty string.
/// 6. Anything else: raw JSON text (documented fallback).
pub fn normalize_field_value(value: &Value) -> String {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => join_items(&items),
            _ => s.clone(),
        },
        Value::Array(items) => join_items(items),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn join_items(items: &[Value]) -> String {
    items
        .iter()
        .map(normalize_field_value)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a field value normalizes to the affirmative ("ticked") sense.
///
/// Affirmative means: boolean `true`, any collection containing a
/// yes-equivalent token, or a scalar string equal to a yes-equivalent
/// token (case-insensitive). Everything else is not affirmative.
pub fn is_affirmative(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Array(items) => items.iter().any(is_affirmative),
        Value::String(s) => {
            // A checkbox value may arrive as a JSON-encoded array string.
            if let Ok(inner @ Value::Array(_)) = serde_json::from_str::<Value>(s) {
                return is_affirmative(&inner);
            }
            let token = s.trim();
            YES_TOKENS.iter().any(|y| token.eq_ignore_ascii_case(y))
        }
        _ => false,
    }
}
