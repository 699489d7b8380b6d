//! Assignee-to-vault routing.
//!
//! The signature service scopes created documents to a storage vault, and
//! which vault depends on the responsible salesperson. The table is static
//! deployment configuration; a missing entry is a fatal precondition for
//! document creation, surfaced before any external write.

use std::collections::HashMap;

use cardsign_core::{BridgeError, BridgeResult};

/// Static lookup from assignee name to signature-service vault identity.
#[derive(Debug, Clone, Default)]
pub struct VaultRoutes {
    routes: HashMap<String, String>,
}

impl VaultRoutes {
    /// Build from an explicit map.
    pub fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// Parse a `Name=vault-id` table from a comma-separated string, the
    /// format used by the `VAULT_ROUTES` environment variable. Entries
    /// without an `=` or with an empty side are dropped.
    pub fn parse(raw: &str) -> Self {
        let routes = raw
            .split(',')
            .filter_map(|pair| {
                let (name, vault) = pair.split_once('=')?;
                let (name, vault) = (name.trim(), vault.trim());
                if name.is_empty() || vault.is_empty() {
                    return None;
                }
                Some((name.to_string(), vault.to_string()))
            })
            .collect();
        Self { routes }
    }

    /// Number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve the vault for an assignee, failing with a
    /// [`BridgeError::Config`] that names the unmapped assignee.
    pub fn resolve(&self, assignee: &str) -> BridgeResult<&str> {
        self.routes
            .get(assignee)
            .map(String::as_str)
            .ok_or_else(|| {
                BridgeError::Config(format!("no vault route configured for assignee: {assignee}"))
            })
    }
}
