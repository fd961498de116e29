//! Per-user credential cache with TTL expiry and single-flight refresh
//! coalescing: concurrent callers for the same user share one in-flight
//! refresh instead of each hitting the token endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::domain::AccountSnapshot;
use crate::error::CredentialError;
use crate::modules::credentials::oauth::{OAuthClient, OAuthToken};
use crate::modules::credentials::store::StoreAdapter;
use crate::modules::security::SecretString;

/// Credentials for one user's upstream session, ready to hand to
/// `UpstreamSession::connect`.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub ctid_trader_account_id: i64,
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: SystemTime,
}

impl Credentials {
    fn from_token(user_id: String, ctid_trader_account_id: i64, token: OAuthToken) -> Self {
        Self {
            user_id,
            ctid_trader_account_id,
            access_token: SecretString::new(token.access_token),
            refresh_token: SecretString::new(token.refresh_token),
            expires_at: token.expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        OAuthToken {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: self.expires_at,
        }
        .is_expired()
    }
}

struct CacheEntry {
    credentials: Credentials,
}

pub struct CredentialCache {
    oauth: OAuthClient,
    store: Arc<dyn StoreAdapter>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CredentialCache {
    pub fn new(oauth: OAuthClient, store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            oauth,
            store,
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return fresh credentials for `user_id`, refreshing (and caching) if
    /// needed. Concurrent calls for the same user coalesce onto one refresh.
    pub async fn get(&self, user_id: &str) -> Result<Credentials, CredentialError> {
        if let Some(creds) = self.cached_if_fresh(user_id).await {
            return Ok(creds);
        }

        let per_user_lock = self.lock_for(user_id).await;
        let _guard = per_user_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(creds) = self.cached_if_fresh(user_id).await {
            return Ok(creds);
        }

        let stored = self.store.load(user_id).await?;
        debug!("Refreshing access token for user {}", user_id);
        let token = self.oauth.refresh(&stored.refresh_token).await?;
        let expires_in_secs = token
            .expires_at
            .duration_since(SystemTime::now())
            .unwrap_or_default()
            .as_secs();
        self.store
            .save_tokens(user_id, &token.access_token, &token.refresh_token, expires_in_secs)
            .await?;

        let credentials = Credentials::from_token(
            user_id.to_string(),
            stored.ctid_trader_account_id,
            token,
        );

        self.entries.write().await.insert(
            user_id.to_string(),
            CacheEntry {
                credentials: credentials.clone(),
            },
        );

        Ok(credentials)
    }

    /// `validate(userId)` is `get(userId).is_some()` per the cache contract.
    pub async fn validate(&self, user_id: &str) -> bool {
        self.get(user_id).await.is_ok()
    }

    /// Evicts one user's cached entry. Never touches the store.
    pub async fn clear(&self, user_id: &str) {
        self.entries.write().await.remove(user_id);
    }

    /// Evicts every cached entry. Never touches the store.
    pub async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    /// Best-effort persistence of the latest account snapshot; failures are
    /// logged, never surfaced to the caller.
    pub async fn save_account_info(&self, user_id: &str, snapshot: &AccountSnapshot) {
        if let Err(e) = self.store.save_account_info(user_id, snapshot).await {
            warn!("Failed to persist account info for user {}: {}", user_id, e);
        }
    }

    /// Best-effort connection-status update; failures are logged, never
    /// surfaced to the caller.
    pub async fn set_connection_status(&self, user_id: &str, connected: bool) {
        if let Err(e) = self.store.set_connection_status(user_id, connected).await {
            warn!("Failed to persist connection status for user {}: {}", user_id, e);
        }
    }

    async fn cached_if_fresh(&self, user_id: &str) -> Option<Credentials> {
        let entries = self.entries.read().await;
        let entry = entries.get(user_id)?;
        if entry.credentials.is_expired() {
            None
        } else {
            Some(entry.credentials.clone())
        }
    }

    async fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::credentials::store::{InMemoryStore, StoredCredentials};

    fn test_cache() -> CredentialCache {
        let http = reqwest::Client::new();
        let oauth = OAuthClient::new(http, "client".into(), "secret".into());
        let store = Arc::new(InMemoryStore::new());
        CredentialCache::new(oauth, store)
    }

    #[tokio::test]
    async fn get_for_unknown_user_fails_without_network() {
        let cache = test_cache();
        let err = cache.get("nobody").await.unwrap_err();
        matches!(err, CredentialError::NotFound(_));
    }

    #[tokio::test]
    async fn clear_removes_cached_entry() {
        let cache = test_cache();
        cache
            .entries
            .write()
            .await
            .insert(
                "u1".into(),
                CacheEntry {
                    credentials: Credentials {
                        user_id: "u1".into(),
                        ctid_trader_account_id: 1,
                        access_token: SecretString::new("a"),
                        refresh_token: SecretString::new("r"),
                        expires_at: SystemTime::now() + std::time::Duration::from_secs(3600),
                    },
                },
            );
        assert!(cache.cached_if_fresh("u1").await.is_some());
        cache.clear("u1").await;
        assert!(cache.cached_if_fresh("u1").await.is_none());

        let _ = StoredCredentials {
            user_id: "u1".into(),
            ctid_trader_account_id: 1,
            refresh_token: "r".into(),
        };
    }

    #[tokio::test]
    async fn validate_is_false_for_unknown_user() {
        let cache = test_cache();
        assert!(!cache.validate("nobody").await);
    }

    #[tokio::test]
    async fn clear_all_empties_every_entry() {
        let cache = test_cache();
        cache.entries.write().await.insert(
            "u1".into(),
            CacheEntry {
                credentials: Credentials {
                    user_id: "u1".into(),
                    ctid_trader_account_id: 1,
                    access_token: SecretString::new("a"),
                    refresh_token: SecretString::new("r"),
                    expires_at: SystemTime::now() + std::time::Duration::from_secs(3600),
                },
            },
        );
        cache.clear_all().await;
        assert!(cache.cached_if_fresh("u1").await.is_none());
    }
}
