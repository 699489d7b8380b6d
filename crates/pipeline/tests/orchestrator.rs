//! End-to-end tests for the orchestrator state machine using in-memory
//! service fakes. No network involved; the fakes record every outbound
//! call so the tests can assert exactly which external writes happened.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use cardsign_core::services::{SignatureService, WorkflowService};
use cardsign_core::types::{Card, Signer};
use cardsign_core::{BridgeError, BridgeResult};
use cardsign_pipeline::{InMemoryGuard, Orchestrator, PipelineSettings, RunOutcome, VaultRoutes};

const TRIGGER_FIELD: &str = "checkbox_disparo";
const LINK_FIELD: &str = "link_documentos_d4";
const DEST_PHASE: &str = "phase-contract-sent";
const LINK_BASE: &str = "https://sign.example/d";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeWorkflow {
    card: Mutex<Card>,
    field_updates: Mutex<Vec<(String, String, String)>>,
    phase_moves: Mutex<Vec<(String, String)>>,
}

impl FakeWorkflow {
    fn new(card: Card) -> Self {
        Self {
            card: Mutex::new(card),
            field_updates: Mutex::new(Vec::new()),
            phase_moves: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WorkflowService for FakeWorkflow {
    async fn fetch_card(&self, _card_id: &str) -> BridgeResult<Card> {
        Ok(self.card.lock().unwrap().clone())
    }

    async fn update_field(
        &self,
        card_id: &str,
        field_id: &str,
        value: &str,
    ) -> BridgeResult<()> {
        self.field_updates.lock().unwrap().push((
            card_id.to_string(),
            field_id.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    async fn move_phase(
        &self,
        card_id: &str,
        phase_id: &str,
        observed_phase: Option<&str>,
    ) -> BridgeResult<()> {
        if observed_phase == Some(phase_id) {
            return Ok(());
        }
        self.phase_moves
            .lock()
            .unwrap()
            .push((card_id.to_string(), phase_id.to_string()));
        Ok(())
    }
}

/// Fake signature service; an optional gate blocks document creation so
/// concurrency tests can hold a run in flight.
struct FakeSignature {
    creates: AtomicU32,
    registers: AtomicU32,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSignature {
    fn new() -> Self {
        Self {
            creates: AtomicU32::new(0),
            registers: AtomicU32::new(0),
            gate: None,
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }
}

#[async_trait]
impl SignatureService for FakeSignature {
    async fn create_from_template(
        &self,
        _vault_id: &str,
        _template_id: &str,
        _title: &str,
        _variables: &BTreeMap<String, String>,
    ) -> BridgeResult<String> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok("doc-77".to_string())
    }

    async fn register_signers(&self, _document_id: &str, _signers: &[Signer]) -> BridgeResult<()> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn card(link_value: Value, trigger_value: Value) -> Card {
    serde_json::from_value(json!({
        "id": "101",
        "title": "Acme contract",
        "assignees": [{"name": "Lucas Santos"}],
        "current_phase": {"id": "phase-proposal", "name": "Proposta"},
        "fields": [
            {"name": "Disparo", "value": trigger_value, "field": {"id": TRIGGER_FIELD}},
            {"name": "Links", "value": link_value, "field": {"id": LINK_FIELD}},
            {"name": "Nome", "value": "Ana Souza", "field": {"id": "nome_do_contato"}},
            {"name": "Email", "value": "ana@acme.com", "field": {"id": "email_profissional"}},
            {"name": "Valor", "value": "300,00", "field": {"id": "valor_do_neg_cio"}},
            {"name": "Parcelas", "value": "3", "field": {"id": "quantidade_de_parcelas"}}
        ]
    }))
    .unwrap()
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        trigger_field_id: TRIGGER_FIELD.to_string(),
        link_field_id: LINK_FIELD.to_string(),
        destination_phase_id: DEST_PHASE.to_string(),
        template_id: "tmpl-contract".to_string(),
        link_base_url: LINK_BASE.to_string(),
        vaults: VaultRoutes::parse("Lucas Santos=vault-lucas,Maria Lima=vault-maria"),
    }
}

fn orchestrator(
    workflow: Arc<FakeWorkflow>,
    signature: Arc<FakeSignature>,
) -> Orchestrator {
    Orchestrator::new(
        workflow,
        signature,
        Arc::new(InMemoryGuard::new(
            Duration::from_secs(30),
            Duration::from_secs(180),
        )),
        settings(),
    )
}

/// A field-update payload reporting an unchecked -> checked edge.
fn edge_payload() -> Value {
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_pipeline_writes_link_and_moves_phase() {
    let workflow = Arc::new(FakeWorkflow::new(card(Value::Null, json!([]))));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(Arc::clone(&workflow), Arc::clone(&signature));

    let outcome = orch.handle_webhook(&edge_payload()).await.unwrap();

    let expected_link = format!("{LINK_BASE}/doc-77");
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            document_id: "doc-77".to_string(),
            link: expected_link.clone(),
        }
    );

    let updates = workflow.field_updates.lock().unwrap();
    assert_eq!(
        updates.as_slice(),
        [("101".to_string(), LINK_FIELD.to_string(), expected_link)]
    );

    let moves = workflow.phase_moves.lock().unwrap();
    assert_eq!(
        moves.as_slice(),
        [("101".to_string(), DEST_PHASE.to_string())]
    );

    assert_eq!(signature.creates.load(Ordering::SeqCst), 1);
    assert_eq!(signature.registers.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_card_id_is_a_client_input_error() {
    let workflow = Arc::new(FakeWorkflow::new(card(Value::Null, json!([]))));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(workflow, Arc::clone(&signature));

    let err = orch.handle_webhook(&json!({"data": {}})).await.unwrap_err();

    assert_matches!(err, BridgeError::Input(_));
    assert_eq!(signature.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_delivery_for_same_card_reports_busy() {
    let gate = Arc::new(Semaphore::new(0));
    let workflow = Arc::new(FakeWorkflow::new(card(Value::Null, json!([]))));
    let signature = Arc::new(FakeSignature::gated(Arc::clone(&gate)));
    let orch = Arc::new(orchestrator(Arc::clone(&workflow), Arc::clone(&signature)));

    // First delivery parks inside document creation, holding the lock.
    let first = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.handle_webhook(&edge_payload()).await }
    });
    // Poll the runtime until the spawned run parks on the gate (every
    // other await in the fakes is immediately ready).
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    assert!(!first.is_finished());

    // Second delivery for the same card must not duplicate any work.
    let second = orch.handle_webhook(&edge_payload()).await.unwrap();
    assert_eq!(second, RunOutcome::Busy);
    assert!(workflow.field_updates.lock().unwrap().is_empty());

    // Unblock the first run; it completes the full pipeline exactly once.
    gate.add_permits(1);
    let first = first.await.unwrap().unwrap();
    assert_matches!(first, RunOutcome::Completed { .. });
    assert_eq!(signature.creates.load(Ordering::SeqCst), 1);
    assert_eq!(workflow.field_updates.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn already_linked_card_short_circuits() {
    let linked = card(json!("https://sign.example/d/doc-12"), json!(["Sim"]));
    let workflow = Arc::new(FakeWorkflow::new(linked));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(Arc::clone(&workflow), Arc::clone(&signature));

    let outcome = orch.handle_webhook(&edge_payload()).await.unwrap();

    assert_eq!(outcome, RunOutcome::AlreadyLinked);
    assert_eq!(signature.creates.load(Ordering::SeqCst), 0);
    assert!(workflow.field_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn affirmative_without_edge_does_not_trigger() {
    let workflow = Arc::new(FakeWorkflow::new(card(Value::Null, json!(["Sim"]))));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(workflow, Arc::clone(&signature));

    let payload = json!({
        "data": {
            "card": {"id": 101},
            "field": {"id": TRIGGER_FIELD},
            "previous_value": ["Sim"],
            "new_value": ["Sim"],
        }
    });
    let outcome = orch.handle_webhook(&payload).await.unwrap();

    assert_eq!(outcome, RunOutcome::NotTriggered);
    assert_eq!(signature.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unmapped_assignee_fails_before_any_signature_call() {
    let mut unrouted = card(Value::Null, json!([]));
    unrouted.assignees[0].name = "João Silva".to_string();
    let workflow = Arc::new(FakeWorkflow::new(unrouted));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(Arc::clone(&workflow), Arc::clone(&signature));

    let err = orch.handle_webhook(&edge_payload()).await.unwrap_err();

    assert_matches!(err, BridgeError::Config(_));
    assert!(err.to_string().contains("João Silva"));
    assert_eq!(signature.creates.load(Ordering::SeqCst), 0);
    assert!(workflow.field_updates.lock().unwrap().is_empty());

    // The failed run released its lock; the next delivery is not Busy.
    let err = orch.handle_webhook(&edge_payload()).await.unwrap_err();
    assert_matches!(err, BridgeError::Config(_));
}

#[tokio::test]
async fn ambiguous_payload_falls_back_to_card_state_with_cooldown() {
    let workflow = Arc::new(FakeWorkflow::new(card(Value::Null, json!(["Sim"]))));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(workflow, Arc::clone(&signature));

    // Unrecognized shape: only a card reference, no field-change details.
    let payload = json!({"data": {"card": {"id": 101}}});

    let outcome = orch.handle_webhook(&payload).await.unwrap();
    assert_matches!(outcome, RunOutcome::Completed { .. });
    assert_eq!(signature.creates.load(Ordering::SeqCst), 1);

    // Immediate redelivery lands inside the cooldown window and the card
    // state alone is no longer enough to regenerate.
    let outcome = orch.handle_webhook(&payload).await.unwrap();
    assert_eq!(outcome, RunOutcome::NotTriggered);
    assert_eq!(signature.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn observed_phase_matching_destination_skips_the_move() {
    let mut already_there = card(Value::Null, json!([]));
    already_there.current_phase = Some(
        serde_json::from_value(json!({"id": DEST_PHASE, "name": "Contrato enviado"})).unwrap(),
    );
    let workflow = Arc::new(FakeWorkflow::new(already_there));
    let signature = Arc::new(FakeSignature::new());
    let orch = orchestrator(Arc::clone(&workflow), Arc::clone(&signature));

    let outcome = orch.handle_webhook(&edge_payload()).await.unwrap();

    assert_matches!(outcome, RunOutcome::Completed { .. });
    assert!(workflow.phase_moves.lock().unwrap().is_empty());
}
