//! Persistence seam for long-lived per-user credentials.
//!
//! The gateway itself never owns durable storage; it talks to whatever
//! backing store the deployment configures through this trait.

use async_trait::async_trait;

use crate::domain::AccountSnapshot;
use crate::error::CredentialError;

#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user_id: String,
    pub ctid_trader_account_id: i64,
    pub refresh_token: String,
}

/// Thin read/write seam over the external credential/status record. The
/// gateway itself never owns this storage; a deployment implements it
/// against its own backend.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Loads the stored refresh token and bound account id for `user_id`.
    async fn load(&self, user_id: &str) -> Result<StoredCredentials, CredentialError>;

    /// Persists a refreshed token pair. Idempotent.
    async fn save_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: u64,
    ) -> Result<(), CredentialError>;

    /// Best-effort; failures are logged by the caller, never surfaced.
    async fn save_account_info(&self, user_id: &str, snapshot: &AccountSnapshot) -> Result<(), CredentialError>;

    /// Best-effort; failures are logged by the caller, never surfaced.
    async fn set_connection_status(&self, user_id: &str, connected: bool) -> Result<(), CredentialError>;
}

/// In-memory double used by tests and by deployments that haven't wired a
/// real store yet.
#[derive(Default)]
pub struct InMemoryStore {
    entries: tokio::sync::RwLock<std::collections::HashMap<String, StoredCredentials>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, creds: StoredCredentials) {
        self.entries.write().await.insert(creds.user_id.clone(), creds);
    }
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn load(&self, user_id: &str) -> Result<StoredCredentials, CredentialError> {
        self.entries
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(user_id.to_string()))
    }

    async fn save_tokens(
        &self,
        user_id: &str,
        _access_token: &str,
        refresh_token: &str,
        _expires_in_secs: u64,
    ) -> Result<(), CredentialError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(user_id)
            .ok_or_else(|| CredentialError::NotFound(user_id.to_string()))?;
        entry.refresh_token = refresh_token.to_string();
        Ok(())
    }

    async fn save_account_info(&self, _user_id: &str, _snapshot: &AccountSnapshot) -> Result<(), CredentialError> {
        Ok(())
    }

    async fn set_connection_status(&self, _user_id: &str, _connected: bool) -> Result<(), CredentialError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_after_insert_round_trips() {
        let store = InMemoryStore::new();
        store
            .insert(StoredCredentials {
                user_id: "u1".into(),
                ctid_trader_account_id: 42,
                refresh_token: "rt".into(),
            })
            .await;

        let loaded = store.load("u1").await.unwrap();
        assert_eq!(loaded.ctid_trader_account_id, 42);
    }

    #[tokio::test]
    async fn load_missing_user_errors() {
        let store = InMemoryStore::new();
        assert!(store.load("ghost").await.is_err());
    }
}
