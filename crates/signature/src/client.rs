//! REST client for the signature service.
//!
//! [`SignatureClient`] implements the [`SignatureService`] port plus the
//! two optional capabilities (download link, explicit send-for-signature).
//! Authentication is two static tokens sent as headers on every call. All
//! requests go through the resilient HTTP layer; malformed or non-JSON
//! bodies fail with the raw response logged for diagnosis.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cardsign_core::services::SignatureService;
use cardsign_core::types::Signer;
use cardsign_core::{BridgeError, BridgeResult};
use cardsign_http::{send_with_retry, RetryPolicy};

/// Retry policy for all signature-service calls.
pub const DEFAULT_POLICY: RetryPolicy =
    RetryPolicy::new(5, Duration::from_millis(600), Duration::from_secs(20));

/// Client for the signature service's REST API.
pub struct SignatureClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    crypt_key: String,
    policy: RetryPolicy,
}

impl SignatureClient {
    /// Build a client against `base_url` with the two static auth tokens.
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_token: String,
        crypt_key: String,
    ) -> Self {
        Self {
            http,
            base_url,
            api_token,
            crypt_key,
            policy: DEFAULT_POLICY,
        }
    }

    /// Override the retry policy (used by tests with tighter budgets).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Request a time-limited retrieval URL for a rendered document.
    ///
    /// Optional capability; the orchestrator writes a constructed link and
    /// does not depend on it.
    pub async fn download_link(
        &self,
        document_id: &str,
        format: &str,
        language: &str,
    ) -> BridgeResult<String> {
        let path = format!("documents/{document_id}/download");
        let body = json!({ "type": format, "language": language });
        let payload = self.post_json(&path, &body).await?;

        payload
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Signature {
                status: 0,
                detail: format!("download response without url: {payload}"),
            })
    }

    /// Explicitly trigger the notification/signing workflow for a document,
    /// for flows where creation and notification are decoupled. `workflow`
    /// selects ordered signing (signers are notified one at a time).
    pub async fn send_for_signature(
        &self,
        document_id: &str,
        message: &str,
        skip_email: bool,
        workflow: bool,
    ) -> BridgeResult<()> {
        let path = format!("documents/{document_id}/sendtosigner");
        let body = json!({
            "message": message,
            "skip_email": flag(skip_email),
            "workflow": flag(workflow),
        });
        self.post_json(&path, &body).await?;
        tracing::info!(document_id, "Document sent for signature");
        Ok(())
    }

    /// POST a JSON body to `path`, returning the parsed response payload.
    async fn post_json(&self, path: &str, body: &Value) -> BridgeResult<Value> {
        let url = format!("{}/{path}", self.base_url);

        let response = send_with_retry(&self.policy, &url, || {
            self.http
                .post(&url)
                .header("tokenAPI", &self.api_token)
                .header("cryptKey", &self.crypt_key)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(body)
        })
        .await
        .map_err(|e| BridgeError::Network {
            attempts: e.attempts(),
            detail: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BridgeError::Signature {
            status: status.as_u16(),
            detail: format!("unreadable response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(BridgeError::Signature {
                status: status.as_u16(),
                detail: text,
            });
        }

        serde_json::from_str(&text).map_err(|_| {
            tracing::error!(url, body = %text, "Signature service returned non-JSON body");
            BridgeError::Signature {
                status: status.as_u16(),
                detail: format!("non-JSON response: {text}"),
            }
        })
    }
}

#[async_trait]
impl SignatureService for SignatureClient {
    async fn create_from_template(
        &self,
        vault_id: &str,
        template_id: &str,
        title: &str,
        variables: &BTreeMap<String, String>,
    ) -> BridgeResult<String> {
        let path = format!("documents/{template_id}/templates");
        let body = json!({
            "uuid_safe": vault_id,
            "templates": [{
                "title": title,
                "email_signer": false,
                "add": variables,
            }]
        });

        let payload = self.post_json(&path, &body).await?;

        let document_id = extract_document_id(&payload).ok_or_else(|| {
            tracing::error!(body = %payload, "Create-from-template response without document id");
            BridgeError::Signature {
                status: 0,
                detail: format!("no document id in response: {payload}"),
            }
        })?;

        tracing::info!(document_id = %document_id, vault_id, "Document created from template");
        Ok(document_id)
    }

    async fn register_signers(&self, document_id: &str, signers: &[Signer]) -> BridgeResult<()> {
        let path = format!("documents/{document_id}/createlist");
        let body = json!({
            "signers": signers.iter().map(wire_signer).collect::<Vec<_>>(),
        });

        self.post_json(&path, &body).await?;
        tracing::info!(document_id, count = signers.len(), "Signers registered");
        Ok(())
    }
}

/// Pull a document identity out of a creation response.
///
/// The service answers either with an array of created documents or a
/// single object; the identifier field is `uuid_document` (or `uuid` on
/// older deployments).
fn extract_document_id(payload: &Value) -> Option<String> {
    let object = match payload {
        Value::Array(items) => items.first()?,
        other => other,
    };
    object
        .get("uuid_document")
        .or_else(|| object.get("uuid"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Encode a domain signer into the service's wire shape, applying the
/// required defaults for omitted fields.
fn wire_signer(signer: &Signer) -> Value {
    json!({
        "email": signer.email,
        "name": signer.name,
        "type_signer": signer.action,
        "foreign": flag(signer.foreign),
        "language": signer.language,
        "skip_email": flag(!signer.notify),
    })
}

/// The service expects boolean flags as `"0"`/`"1"` strings.
fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}
