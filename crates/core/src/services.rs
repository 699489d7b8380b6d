//! Outbound service port traits.
//!
//! The orchestrator talks to the two SaaS collaborators through these
//! traits so tests can substitute in-memory fakes. The concrete
//! implementations live in `cardsign-workflow` and `cardsign-signature`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::types::{Card, DocumentRequest, Signer};

/// Port onto the workflow SaaS (card queries and mutations).
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Fetch the current state of a card: title, phase, assignees, fields.
    async fn fetch_card(&self, card_id: &str) -> BridgeResult<Card>;

    /// Overwrite a single field's value on a card.
    async fn update_field(&self, card_id: &str, field_id: &str, value: &str)
        -> BridgeResult<()>;

    /// Move a card to `phase_id`.
    ///
    /// When `observed_phase` already equals the destination this is a
    /// no-op, and a service rejection caused by the card already sitting in
    /// the destination phase counts as success. Any other rejection
    /// propagates.
    async fn move_phase(
        &self,
        card_id: &str,
        phase_id: &str,
        observed_phase: Option<&str>,
    ) -> BridgeResult<()>;
}

/// Port onto the signature SaaS (document creation and signer registration).
#[async_trait]
pub trait SignatureService: Send + Sync {
    /// Create a document from a template with variable substitution.
    /// Returns the service-assigned document identity.
    async fn create_from_template(
        &self,
        vault_id: &str,
        template_id: &str,
        title: &str,
        variables: &BTreeMap<String, String>,
    ) -> BridgeResult<String>;

    /// Attach signers to a previously created document.
    async fn register_signers(&self, document_id: &str, signers: &[Signer]) -> BridgeResult<()>;

    /// Composite create-then-register.
    ///
    /// If signer registration fails the already-created document is left
    /// orphaned in the signature service (a recoverable inconsistency, not
    /// rolled back) and the failure propagates.
    async fn create_document(&self, request: &DocumentRequest) -> BridgeResult<String> {
        let document_id = self
            .create_from_template(
                &request.vault_id,
                &request.template_id,
                &request.title,
                &request.variables,
            )
            .await?;

        if let Err(err) = self.register_signers(&document_id, &request.signers).await {
            tracing::warn!(
                document_id = %document_id,
                error = %err,
                "Signer registration failed; created document left orphaned"
            );
            return Err(err);
        }

        Ok(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fake that counts calls and optionally fails signer registration.
    struct FakeSignature {
        creates: AtomicU32,
        registers: AtomicU32,
        fail_register: bool,
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
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok("doc-1".to_string())
        }

        async fn register_signers(
            &self,
            _document_id: &str,
            _signers: &[Signer],
        ) -> BridgeResult<()> {
            self.registers.fetch_add(1, Ordering::SeqCst);
            if self.fail_register {
                return Err(BridgeError::Signature {
                    status: 500,
                    detail: "register failed".into(),
                });
            }
            Ok(())
        }
    }

    fn request() -> DocumentRequest {
        DocumentRequest {
            vault_id: "vault-1".into(),
            template_id: "tmpl-1".into(),
            title: "Contract".into(),
            variables: BTreeMap::new(),
            signers: vec![Signer::new("a@b.com", "Ana")],
        }
    }

    #[tokio::test]
    async fn composite_sequences_create_then_register() {
        let fake = FakeSignature {
            creates: AtomicU32::new(0),
            registers: AtomicU32::new(0),
            fail_register: false,
        };
        let id = fake.create_document(&request()).await.unwrap();
        assert_eq!(id, "doc-1");
        assert_eq!(fake.creates.load(Ordering::SeqCst), 1);
        assert_eq!(fake.registers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn composite_propagates_register_failure_without_rollback() {
        let fake = FakeSignature {
            creates: AtomicU32::new(0),
            registers: AtomicU32::new(0),
            fail_register: true,
        };
        let err = fake.create_document(&request()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Signature { status: 500, .. }));
        // The document was created and stays created.
        assert_eq!(fake.creates.load(Ordering::SeqCst), 1);
    }
}
