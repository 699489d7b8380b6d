//! Deployment configuration loaded from environment variables.

use cardsign_pipeline::VaultRoutes;

/// Everything the bridge needs at startup: listen address, the two SaaS
/// endpoints with their credentials, the monitored/target identifiers, and
/// the assignee-to-vault routing table.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Inbound HTTP request timeout in seconds (default: `300` -- a run
    /// spans up to four retried external calls).
    pub request_timeout_secs: u64,

    /// Workflow-service GraphQL endpoint.
    pub workflow_endpoint: String,
    /// Workflow-service bearer token.
    pub workflow_token: String,

    /// Signature-service REST base URL.
    pub signature_base_url: String,
    /// Signature-service API token.
    pub signature_token: String,
    /// Signature-service crypt key (second static credential).
    pub signature_crypt_key: String,

    /// Field whose affirmative edge triggers generation.
    pub trigger_field_id: String,
    /// Field the generated document link is written back to.
    pub link_field_id: String,
    /// Phase the card advances to after the link is written.
    pub destination_phase_id: String,
    /// Template the contract document is rendered from.
    pub template_id: String,
    /// Base URL the document identity is appended to for the card link.
    pub link_base_url: String,
    /// Assignee-to-vault routing table.
    pub vault_routes: VaultRoutes,
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Credentials and deployment identifiers have no defaults and panic
    /// when missing -- misconfiguration should fail at startup, not on the
    /// first webhook.
    ///
    /// | Env Var                     | Default                                  |
    /// |-----------------------------|------------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                                |
    /// | `PORT`                      | `3000`                                   |
    /// | `REQUEST_TIMEOUT_SECS`      | `300`                                    |
    /// | `WORKFLOW_GRAPHQL_ENDPOINT` | `https://api.pipefy.com/graphql`         |
    /// | `WORKFLOW_API_TOKEN`        | required                                 |
    /// | `SIGNATURE_API_URL`         | `https://api.d4sign.com.br/api/v1`       |
    /// | `SIGNATURE_API_TOKEN`       | required                                 |
    /// | `SIGNATURE_CRYPT_KEY`       | required                                 |
    /// | `TRIGGER_FIELD_ID`          | `checkbox_disparo`                       |
    /// | `LINK_FIELD_ID`             | `link_documentos_d4`                     |
    /// | `DESTINATION_PHASE_ID`      | required                                 |
    /// | `TEMPLATE_ID`               | required                                 |
    /// | `LINK_BASE_URL`             | `https://secure.d4sign.com.br/Plus`      |
    /// | `VAULT_ROUTES`              | required, `Name=vault-id` pairs, commas  |
    pub fn from_env() -> Self {
        let vault_routes = VaultRoutes::parse(&required("VAULT_ROUTES"));
        if vault_routes.is_empty() {
            panic!("VAULT_ROUTES must contain at least one Name=vault-id pair");
        }

        Self {
            host: optional("HOST", "0.0.0.0"),
            port: optional("PORT", "3000")
                .parse()
                .expect("PORT must be a valid u16"),
            request_timeout_secs: optional("REQUEST_TIMEOUT_SECS", "300")
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a valid u64"),

            workflow_endpoint: optional(
                "WORKFLOW_GRAPHQL_ENDPOINT",
                "https://api.pipefy.com/graphql",
            ),
            workflow_token: required("WORKFLOW_API_TOKEN"),

            signature_base_url: optional("SIGNATURE_API_URL", "https://api.d4sign.com.br/api/v1"),
            signature_token: required("SIGNATURE_API_TOKEN"),
            signature_crypt_key: required("SIGNATURE_CRYPT_KEY"),

            trigger_field_id: optional("TRIGGER_FIELD_ID", "checkbox_disparo"),
            link_field_id: optional("LINK_FIELD_ID", "link_documentos_d4"),
            destination_phase_id: required("DESTINATION_PHASE_ID"),
            template_id: required("TEMPLATE_ID"),
            link_base_url: optional("LINK_BASE_URL", "https://secure.d4sign.com.br/Plus"),
            vault_routes,
        }
    }
}

fn required(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
