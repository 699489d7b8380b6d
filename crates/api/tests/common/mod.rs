//! Shared helpers for API integration tests: in-memory service stubs and
//! a router builder that mirrors the production middleware stack.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};

use cardsign_api::router::build_app_router;
use cardsign_api::state::AppState;
use cardsign_core::services::{SignatureService, WorkflowService};
use cardsign_core::types::{Card, Signer};
use cardsign_core::BridgeResult;
use cardsign_pipeline::{InMemoryGuard, Orchestrator, PipelineSettings, VaultRoutes};

pub const TRIGGER_FIELD: &str = "checkbox_disparo";
pub const LINK_FIELD: &str = "link_documentos_d4";
pub const DEST_PHASE: &str = "phase-contract-sent";

/// Workflow stub: serves one fixed card, accepts all mutations.
pub struct StubWorkflow {
    card: Card,
}

#[async_trait]
impl WorkflowService for StubWorkflow {
    async fn fetch_card(&self, _card_id: &str) -> BridgeResult<Card> {
        Ok(self.card.clone())
    }

    async fn update_field(
        &self,
        _card_id: &str,
        _field_id: &str,
        _value: &str,
    ) -> BridgeResult<()> {
        Ok(())
    }

    async fn move_phase(
        &self,
        _card_id: &str,
        _phase_id: &str,
        _observed_phase: Option<&str>,
    ) -> BridgeResult<()> {
        Ok(())
    }
}

/// Signature stub: every creation yields the same document id.
pub struct StubSignature;

#[async_trait]
impl SignatureService for StubSignature {
    async fn create_from_template(
        &self,
        _vault_id: &str,
        _template_id: &str,
        _title: &str,
        _variables: &BTreeMap<String, String>,
    ) -> BridgeResult<String> {
        Ok("doc-900".to_string())
    }

    async fn register_signers(&self, _document_id: &str, _signers: &[Signer]) -> BridgeResult<()> {
        Ok(())
    }
}

/// A card assigned to `assignee` with an empty link field and an unchecked
/// trigger field.
pub fn sample_card(assignee: &str) -> Card {
    serde_json::from_value(json!({
        "id": "101",
        "title": "Acme contract",
        "assignees": [{"name": assignee}],
        "current_phase": {"id": "phase-proposal", "name": "Proposta"},
        "fields": [
            {"name": "Disparo", "value": [], "field": {"id": TRIGGER_FIELD}},
            {"name": "Links", "value": null, "field": {"id": LINK_FIELD}},
            {"name": "Nome", "value": "Ana Souza", "field": {"id": "nome_do_contato"}},
            {"name": "Email", "value": "ana@acme.com", "field": {"id": "email_profissional"}}
        ]
    }))
    .unwrap()
}

/// A field-update payload reporting an unchecked -> checked edge.
pub fn edge_payload() -> Value {
    json!({
        "data": {
            "action": "card.field_update",
            "card": {"id": 101},
            "field": {"id": TRIGGER_FIELD},
            "previous_value": null,
            "new_value": ["Sim"],
        }
    })
}

/// Build the app router over stub services, with the production middleware
/// stack and `Lucas Santos` as the only routed assignee.
pub fn test_app(card: Card) -> Router {
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(StubWorkflow { card }),
        Arc::new(StubSignature),
        Arc::new(InMemoryGuard::new(
            Duration::from_secs(30),
            Duration::from_secs(180),
        )),
        PipelineSettings {
            trigger_field_id: TRIGGER_FIELD.to_string(),
            link_field_id: LINK_FIELD.to_string(),
            destination_phase_id: DEST_PHASE.to_string(),
            template_id: "tmpl-contract".to_string(),
            link_base_url: "https://sign.example/d".to_string(),
            vaults: VaultRoutes::parse("Lucas Santos=vault-lucas"),
        },
    ));

    build_app_router(AppState { orchestrator }, 30)
}
