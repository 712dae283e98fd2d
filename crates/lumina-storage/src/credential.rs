//! The API credential store and its precedence rules.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use lumina_core::storage_keys;

use crate::error::StorageError;
use crate::kv::KeyValueStore;

/// Environment variable carrying a deployment-provided credential. When set
/// it takes priority over any user-supplied value.
pub const DEPLOYMENT_CREDENTIAL_ENV: &str = "LUMINA_API_KEY";

/// A secret authorizing calls to the AI provider.
///
/// `Debug` renders a redacted hint only, so credentials never leak into
/// logs or error chains.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", redact(&self.0))
    }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 8 {
        return "****".to_string();
    }
    let prefix = &secret[..4];
    let suffix = &secret[secret.len() - 4..];
    format!("{prefix}...{suffix}")
}

/// Resolves the effective credential: deployment-provided first, then the
/// user-supplied value persisted in the key-value store.
///
/// The store is consulted on every [`CredentialStore::current`] call, so a
/// credential written by another process is picked up without a restart.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    deployment: Option<Credential>,
}

impl CredentialStore {
    /// Capture the deployment credential from the environment, if present.
    pub fn from_env(store: Arc<dyn KeyValueStore>) -> Self {
        let deployment = std::env::var(DEPLOYMENT_CREDENTIAL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Credential::new);
        Self { store, deployment }
    }

    /// Explicit deployment credential, for wiring and tests.
    pub fn with_deployment(store: Arc<dyn KeyValueStore>, deployment: Option<Credential>) -> Self {
        Self { store, deployment }
    }

    /// The effective credential, or `None` when neither source has one.
    pub fn current(&self) -> Option<Credential> {
        if let Some(cred) = &self.deployment {
            return Some(cred.clone());
        }
        self.store
            .get(storage_keys::USER_CREDENTIAL)
            .ok()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .map(Credential::new)
    }

    pub fn has_access(&self) -> bool {
        self.current().is_some()
    }

    /// Persist a user-supplied credential. Effective immediately for
    /// subsequent calls (unless a deployment credential shadows it).
    pub fn set_user_credential(&self, secret: &str) -> Result<(), StorageError> {
        self.store.set(storage_keys::USER_CREDENTIAL, secret)?;
        info!("user credential updated");
        Ok(())
    }

    pub fn clear_user_credential(&self) -> Result<(), StorageError> {
        self.store.remove(storage_keys::USER_CREDENTIAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn absent_everywhere_means_no_access() {
        let creds = CredentialStore::with_deployment(store(), None);
        assert!(creds.current().is_none());
        assert!(!creds.has_access());
    }

    #[test]
    fn deployment_credential_wins_over_user_value() {
        let kv = store();
        let creds = CredentialStore::with_deployment(
            Arc::clone(&kv),
            Some(Credential::new("deployment-key")),
        );
        creds.set_user_credential("user-key").unwrap();
        assert_eq!(creds.current().unwrap().secret(), "deployment-key");
    }

    #[test]
    fn user_credential_becomes_effective_immediately() {
        let creds = CredentialStore::with_deployment(store(), None);
        assert!(!creds.has_access());
        creds.set_user_credential("user-key").unwrap();
        assert_eq!(creds.current().unwrap().secret(), "user-key");
    }

    #[test]
    fn credential_written_behind_the_store_is_picked_up() {
        let kv = store();
        let creds = CredentialStore::with_deployment(Arc::clone(&kv), None);
        assert!(!creds.has_access());

        // Another tab/process writes the key directly.
        kv.set(storage_keys::USER_CREDENTIAL, "late-key").unwrap();
        assert_eq!(creds.current().unwrap().secret(), "late-key");
    }

    #[test]
    fn blank_values_do_not_grant_access() {
        let creds = CredentialStore::with_deployment(store(), None);
        creds.set_user_credential("   ").unwrap();
        assert!(!creds.has_access());
    }

    #[test]
    fn debug_output_is_redacted() {
        let cred = Credential::new("super-secret-api-key");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("super-secret-api-key"));
        assert!(rendered.contains("supe..."));
    }
}
