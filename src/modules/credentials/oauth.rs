//! OAuth refresh-token flow against the broker's token endpoint.
//!
//! Generalizes the single-account client the teacher used for one bot
//! account into a stateless client any number of tenants can share.

use serde::Deserialize;
use std::time::{Duration, SystemTime};

use crate::error::CredentialError;

const TOKEN_URL: &str = "https://connect.spotware.com/apps/token";
const REFRESH_BUFFER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: SystemTime,
}

impl OAuthToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at.duration_since(SystemTime::now()) {
            Ok(remaining) => remaining < REFRESH_BUFFER,
            Err(_) => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

/// Thin HTTP client around the broker's token endpoint. Holds no per-user
/// state; the cache above it is what's per-tenant.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthToken, CredentialError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::RefreshFailed(format!("{status}: {body}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::RefreshFailed(e.to_string()))?;

        Ok(OAuthToken {
            access_token: body.access_token,
            refresh_token: body.refresh_token.unwrap_or_else(|| refresh_token.to_string()),
            expires_at: SystemTime::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_within_refresh_buffer_is_expired() {
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: SystemTime::now() + Duration::from_secs(60),
        };
        assert!(token.is_expired());
    }

    #[test]
    fn token_well_past_buffer_is_not_expired() {
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
        };
        assert!(!token.is_expired());
    }
}
