//! Card, signer, and document-request data model.
//!
//! [`Card`] mirrors what the workflow service returns for a single card
//! query. Cards are always fetched fresh per webhook invocation and never
//! cached or mutated locally; the workflow service is the source of truth.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A unit of work in the workflow service.
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    /// Opaque card identity (the service's ID scalar serializes as a string).
    pub id: String,
    /// Card title, reused as the generated document title.
    pub title: String,
    /// Assignees in service order; the first one is the responsible vendor.
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    /// The phase the card currently sits in.
    pub current_phase: Option<Phase>,
    /// All fields with their declared identities and values.
    #[serde(default)]
    pub fields: Vec<CardField>,
}

/// A named stage in a card's workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct Phase {
    pub id: String,
    pub name: String,
}

/// A person assigned to a card.
#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One field slot on a card.
///
/// The service reports two value channels (`value` and `report_value`); the
/// direct value wins when present, see [`Card::field_value`].
#[derive(Debug, Clone, Deserialize)]
pub struct CardField {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub report_value: Option<serde_json::Value>,
    pub field: FieldIdentity,
}

/// Declared identity of a field: a primary id plus an optional stable
/// internal id. Lookups match either.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldIdentity {
    pub id: String,
    #[serde(default)]
    pub internal_id: Option<String>,
}

impl Card {
    /// Look up a field value by primary or internal field id.
    ///
    /// Prefers the direct `value`, falling back to `report_value`. Returns
    /// `None` when the field is absent or both channels are null.
    pub fn field_value(&self, field_id: &str) -> Option<&serde_json::Value> {
        let slot = self.fields.iter().find(|f| {
            f.field.id == field_id || f.field.internal_id.as_deref() == Some(field_id)
        })?;
        slot.value
            .as_ref()
            .filter(|v| !v.is_null())
            .or(slot.report_value.as_ref().filter(|v| !v.is_null()))
    }

    /// Name of the first assignee, if any.
    pub fn primary_assignee(&self) -> Option<&str> {
        self.assignees.first().map(|a| a.name.as_str())
    }
}

/// A party registered to sign a created document.
///
/// [`Signer::new`] applies the defaults expected by the signature service
/// for any field the transform does not set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signer {
    pub email: String,
    pub name: String,
    /// Signature action code, e.g. `sign`.
    pub action: String,
    /// Whether the signer is outside the service's home jurisdiction.
    pub foreign: bool,
    /// Locale used for the signer-facing notification.
    pub language: String,
    /// Whether the service should email the signer.
    pub notify: bool,
}

impl Signer {
    /// Build a signer with service defaults: `sign` action, not foreign,
    /// `pt-BR` locale, notification enabled.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            action: "sign".to_string(),
            foreign: false,
            language: "pt-BR".to_string(),
            notify: true,
        }
    }
}

/// Everything the signature service needs to produce one document.
///
/// Produced by the contract transform, consumed exactly once by
/// [`crate::services::SignatureService::create_document`].
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    /// Storage vault the document is created in (routed by assignee).
    pub vault_id: String,
    /// Template the document is rendered from.
    pub template_id: String,
    /// Human-facing document title (usually the card title).
    pub title: String,
    /// Template-token name to rendered string value.
    pub variables: BTreeMap<String, String>,
    /// Parties to register on the created document.
    pub signers: Vec<Signer>,
}
