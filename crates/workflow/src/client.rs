//! GraphQL client for the workflow service.
//!
//! [`WorkflowClient`] implements the [`WorkflowService`] port: fetch a
//! card, overwrite one field, move a card to a phase. All requests go
//! through the resilient HTTP layer with a fixed retry policy; GraphQL
//! transport errors and reported field errors both surface as
//! [`BridgeError::Upstream`] with the raw payload preserved.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cardsign_core::services::WorkflowService;
use cardsign_core::types::Card;
use cardsign_core::{BridgeError, BridgeResult};
use cardsign_http::{send_with_retry, RetryPolicy};

/// Retry policy for all workflow-service calls.
pub const DEFAULT_POLICY: RetryPolicy =
    RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(20));

const CARD_QUERY: &str = "
query($cardId: ID!) {
  card(id: $cardId) {
    id title assignees { name email } current_phase { id name }
    fields { name value report_value field { id internal_id } }
  }
}";

/// Field updates go through the typed update contract so the field is
/// overwritten cleanly, not merged into the previous value (the legacy
/// set-raw-value mutation merges).
const UPDATE_FIELD_MUTATION: &str = "
mutation($input: UpdateCardFieldInput!) {
  updateCardField(input: $input) { success }
}";

const MOVE_CARD_MUTATION: &str = "
mutation($input: MoveCardToPhaseInput!) {
  moveCardToPhase(input: $input) { card { id current_phase { id name } } }
}";

/// Client for the workflow service's GraphQL API.
pub struct WorkflowClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    policy: RetryPolicy,
}

impl WorkflowClient {
    /// Build a client against `endpoint`, authenticating with a static
    /// bearer `token`. The `http` client is shared for connection reuse.
    pub fn new(http: reqwest::Client, endpoint: String, token: String) -> Self {
        Self {
            http,
            endpoint,
            token,
            policy: DEFAULT_POLICY,
        }
    }

    /// Override the retry policy (used by tests with tighter budgets).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute one GraphQL request and return the `data` object.
    async fn execute(&self, query: &str, variables: Value) -> BridgeResult<Value> {
        let body = json!({ "query": query, "variables": variables });

        let response = send_with_retry(&self.policy, &self.endpoint, || {
            self.http
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&body)
        })
        .await
        .map_err(|e| BridgeError::Network {
            attempts: e.attempts(),
            detail: e.to_string(),
        })?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::Upstream(format!("non-JSON response: {e}")))?;

        if !status.is_success() {
            return Err(BridgeError::Upstream(format!(
                "HTTP {status}: {payload}"
            )));
        }
        if let Some(errors) = graphql_errors(&payload) {
            return Err(BridgeError::Upstream(errors));
        }

        Ok(payload.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl WorkflowService for WorkflowClient {
    async fn fetch_card(&self, card_id: &str) -> BridgeResult<Card> {
        let data = self
            .execute(CARD_QUERY, json!({ "cardId": card_id }))
            .await?;
        parse_card(&data)
    }

    async fn update_field(
        &self,
        card_id: &str,
        field_id: &str,
        value: &str,
    ) -> BridgeResult<()> {
        self.execute(
            UPDATE_FIELD_MUTATION,
            update_field_variables(card_id, field_id, value),
        )
        .await?;
        tracing::debug!(card_id, field_id, "Card field updated");
        Ok(())
    }

    async fn move_phase(
        &self,
        card_id: &str,
        phase_id: &str,
        observed_phase: Option<&str>,
    ) -> BridgeResult<()> {
        if observed_phase == Some(phase_id) {
            tracing::debug!(card_id, phase_id, "Card already in destination phase, skipping move");
            return Ok(());
        }

        let variables = json!({
            "input": { "card_id": card_id, "destination_phase_id": phase_id }
        });

        match self.execute(MOVE_CARD_MUTATION, variables).await {
            Ok(_) => {
                tracing::info!(card_id, phase_id, "Card moved to destination phase");
                Ok(())
            }
            Err(BridgeError::Upstream(detail)) if is_already_in_phase(&detail) => {
                tracing::debug!(card_id, phase_id, "Move rejected as already-in-phase, treating as success");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Extract a non-empty GraphQL `errors` array as a raw string, if present.
fn graphql_errors(payload: &Value) -> Option<String> {
    let errors = payload.get("errors")?;
    match errors {
        Value::Array(items) if items.is_empty() => None,
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Variables for the typed field-update mutation.
fn update_field_variables(card_id: &str, field_id: &str, value: &str) -> Value {
    json!({
        "input": {
            "card_id": card_id,
            "field_id": field_id,
            "new_value": { "string_value": value },
        }
    })
}

/// Whether a rejection payload means "card is already in the destination
/// phase" -- the one rejection [`WorkflowService::move_phase`] tolerates.
fn is_already_in_phase(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    lower.contains("already") && lower.contains("phase")
}

/// Parse the `card` object out of a GraphQL `data` payload.
fn parse_card(data: &Value) -> BridgeResult<Card> {
    let card = data
        .get("card")
        .filter(|c| !c.is_null())
        .ok_or_else(|| BridgeError::Upstream(format!("no card in response: {data}")))?;
    serde_json::from_value(card.clone())
        .map_err(|e| BridgeError::Upstream(format!("malformed card payload: {e}")))
}
