//! Secret handling for the gateway: redaction wrapper plus startup
//! validation of the broker app credentials.

pub mod secrets;

pub use secrets::{SecretString, SecretValidator};
