//! Redaction wrapper for credential fields that must never reach logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A string that always prints as `[REDACTED]` through `Debug`/`Display`.
/// Used for access tokens, refresh tokens and client secrets so an errant
/// `{:?}` on a `Credentials` struct can't leak one into the logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Checks that the required broker app credentials are present and
/// non-placeholder before the gateway starts accepting connections.
pub struct SecretValidator;

impl SecretValidator {
    pub fn validate_required(client_id: &str, client_secret: &str) -> Result<(), String> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err("broker client_id/client_secret must not be empty".to_string());
        }
        if client_secret.len() < 8 {
            return Err("broker client_secret looks too short to be real".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_redact() {
        let secret = SecretString::new("super-secret-token");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "super-secret-token");
    }

    #[test]
    fn validator_rejects_empty_secret() {
        assert!(SecretValidator::validate_required("id", "").is_err());
    }

    #[test]
    fn validator_accepts_plausible_secret() {
        assert!(SecretValidator::validate_required("id", "a-real-looking-secret").is_ok());
    }
}
