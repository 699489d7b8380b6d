//! The webhook orchestrator.
//!
//! One run walks `Received -> Locked -> Fetching -> Deciding -> Generating
//! -> Finalizing -> Done`, with early exits for a missing card identity,
//! a held lock, an unfired trigger, and a link field that is already
//! populated. The populated link field is the primary idempotency signal
//! (it survives process restarts); the in-memory cooldown only guards the
//! ambiguous-trigger fallback path.

use std::sync::Arc;

use serde_json::Value;

use cardsign_core::fields::{is_affirmative, normalize_field_value};
use cardsign_core::services::{SignatureService, WorkflowService};
use cardsign_core::trigger::{evaluate, TriggerDecision, TriggerSignal, WebhookEvent};
use cardsign_core::types::{Card, DocumentRequest};
use cardsign_core::{BridgeError, BridgeResult};

use crate::guard::ConcurrencyGuard;
use crate::transform;
use crate::vault::VaultRoutes;

/// Deployment-level identifiers the pipeline operates on.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Field whose affirmative edge triggers generation.
    pub trigger_field_id: String,
    /// Field the document link is written back to.
    pub link_field_id: String,
    /// Phase the card advances to after the link is written.
    pub destination_phase_id: String,
    /// Signature-service template the document is rendered from.
    pub template_id: String,
    /// Base URL the document identity is appended to for the card link.
    pub link_base_url: String,
    /// Assignee-to-vault routing table.
    pub vaults: VaultRoutes,
}

/// Terminal state of one orchestrator run (excluding errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The full pipeline ran: document created, link written, phase moved.
    Completed {
        document_id: String,
        link: String,
    },
    /// The link field was already populated; nothing regenerated.
    AlreadyLinked,
    /// The event did not represent a trigger edge.
    NotTriggered,
    /// Another run holds the lock for this card.
    Busy,
}

/// Sequences the fetch -> decide -> generate -> finalize pipeline for one
/// webhook delivery.
pub struct Orchestrator {
    workflow: Arc<dyn WorkflowService>,
    signature: Arc<dyn SignatureService>,
    guard: Arc<dyn ConcurrencyGuard>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        workflow: Arc<dyn WorkflowService>,
        signature: Arc<dyn SignatureService>,
        guard: Arc<dyn ConcurrencyGuard>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            workflow,
            signature,
            guard,
            settings,
        }
    }

    /// Process one inbound webhook payload.
    ///
    /// Every path that acquires the lock releases it exactly once; business
    /// failures come back as `Err` for the HTTP layer to report without a
    /// 5xx (the webhook sender must not re-deliver on failures it cannot
    /// fix).
    pub async fn handle_webhook(&self, payload: &Value) -> BridgeResult<RunOutcome> {
        let event = WebhookEvent::parse(payload);
        let card_id = event
            .card_id
            .ok_or_else(|| BridgeError::Input("webhook payload carries no card id".to_string()))?;

        if !self.guard.try_acquire(&card_id) {
            tracing::info!(card_id = %card_id, "Generation already in flight, rejecting duplicate");
            return Ok(RunOutcome::Busy);
        }

        let result = self.run_locked(&card_id, &event.signal).await;

        match &result {
            Ok(RunOutcome::Completed { document_id, .. }) => {
                self.guard.record_success(&card_id);
                tracing::info!(card_id = %card_id, document_id = %document_id, "Generation completed");
            }
            Ok(outcome) => {
                tracing::debug!(card_id = %card_id, ?outcome, "Run ended without generation");
            }
            Err(err) => {
                tracing::error!(card_id = %card_id, error = %err, "Generation run failed");
            }
        }

        self.guard.release(&card_id);
        result
    }

    /// The lock-holding portion of the state machine.
    async fn run_locked(
        &self,
        card_id: &str,
        signal: &TriggerSignal,
    ) -> BridgeResult<RunOutcome> {
        // Fetching: the card is always read fresh, never cached.
        let card = self.workflow.fetch_card(card_id).await?;

        // Deciding, durable idempotency first: a populated link field means
        // a previous run already finished for this card.
        if self.link_already_written(&card) {
            return Ok(RunOutcome::AlreadyLinked);
        }

        let fire = match evaluate(signal, &self.settings.trigger_field_id) {
            TriggerDecision::Fire => true,
            TriggerDecision::Skip => false,
            TriggerDecision::Unknown => self.fallback_trigger(card_id, &card),
        };
        if !fire {
            return Ok(RunOutcome::NotTriggered);
        }

        // Generating: resolve the vault before any external write so a
        // configuration gap fails the run cleanly.
        let data = transform::contract_data(&card);
        let vault_id = self.settings.vaults.resolve(&data.vendor)?.to_string();

        let request = DocumentRequest {
            vault_id,
            template_id: self.settings.template_id.clone(),
            title: card.title.clone(),
            variables: transform::template_variables(&data),
            signers: transform::signer_list(&data),
        };
        let document_id = self.signature.create_document(&request).await?;

        // Finalizing: write the link back, then advance the phase.
        let link = format!(
            "{}/{}",
            self.settings.link_base_url.trim_end_matches('/'),
            document_id
        );
        self.workflow
            .update_field(card_id, &self.settings.link_field_id, &link)
            .await?;

        let observed_phase = card.current_phase.as_ref().map(|p| p.id.as_str());
        self.workflow
            .move_phase(card_id, &self.settings.destination_phase_id, observed_phase)
            .await?;

        Ok(RunOutcome::Completed { document_id, link })
    }

    fn link_already_written(&self, card: &Card) -> bool {
        card.field_value(&self.settings.link_field_id)
            .map(normalize_field_value)
            .is_some_and(|link| !link.trim().is_empty())
    }

    /// Fallback for payload shapes that carry no usable trigger signal:
    /// re-check the monitored field on the freshly fetched card, but only
    /// outside the cooldown window.
    fn fallback_trigger(&self, card_id: &str, card: &Card) -> bool {
        if self.guard.cooldown_active(card_id) {
            tracing::debug!(card_id, "Ambiguous trigger within cooldown window, suppressing");
            return false;
        }
        card.field_value(&self.settings.trigger_field_id)
            .is_some_and(is_affirmative)
    }
}
