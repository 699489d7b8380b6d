//! Bridge-wide error taxonomy.
//!
//! Transient network failures are absorbed by the resilient HTTP layer and
//! only surface here (as [`BridgeError::Network`]) once retries exhaust.
//! Everything else maps onto the category of the collaborator that failed.

/// Error type shared by the outbound clients and the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed or incomplete inbound webhook (e.g. no card identity).
    /// The only category surfaced to the webhook sender as HTTP 400.
    #[error("invalid webhook payload: {0}")]
    Input(String),

    /// Non-success response or reported field errors from the workflow
    /// service. Carries the raw error payload for diagnosis.
    #[error("workflow service error: {0}")]
    Upstream(String),

    /// Non-success or malformed response from the signature service.
    #[error("signature service error ({status}): {detail}")]
    Signature {
        /// HTTP status of the failing response (0 when the body, not the
        /// status, was the problem).
        status: u16,
        /// Raw response body or a parse-failure description.
        detail: String,
    },

    /// A deployment precondition is unmet (e.g. no vault route for an
    /// assignee). Raised before any external write occurs.
    #[error("configuration error: {0}")]
    Config(String),

    /// A network-level failure that survived the retry budget.
    #[error("network failure after {attempts} attempts: {detail}")]
    Network {
        /// How many attempts were made before giving up.
        attempts: u32,
        /// Description of the last failure.
        detail: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category() {
        let err = BridgeError::Upstream("{\"errors\":[...]}".into());
        assert!(err.to_string().starts_with("workflow service error"));

        let err = BridgeError::Signature {
            status: 422,
            detail: "bad template".into(),
        };
        assert_eq!(
            err.to_string(),
            "signature service error (422): bad template"
        );
    }

    #[test]
    fn network_error_reports_attempts() {
        let err = BridgeError::Network {
            attempts: 5,
            detail: "connection reset".into(),
        };
        assert!(err.to_string().contains("after 5 attempts"));
    }
}
