//! Custom error types for the gateway
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream broker session errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Codec framing/decoding errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Credential/OAuth errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Downstream session errors
    #[error("Downstream error: {0}")]
    Downstream(String),

    /// Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Upstream session specific errors
#[derive(Debug, Error, Clone)]
pub enum UpstreamError {
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Timeout waiting for {op} ({payload_type})")]
    RequestTimeout { op: String, payload_type: i32 },

    #[error("Upstream closed (code {code}): {reason}")]
    UpstreamClosed { code: u16, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Codec (framing / protobuf) errors
#[derive(Debug, Error, Clone)]
pub enum CodecError {
    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Unknown payload type: {0}")]
    UnknownType(i32),
}

/// Credential cache / OAuth errors
#[derive(Debug, Error, Clone)]
pub enum CredentialError {
    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No credentials cached for user {0}")]
    NotFound(String),
}

/// Errors surfaced to the downstream client as an `error` frame
#[derive(Debug, Error, Clone)]
pub enum ClientFacingError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Bad command: {0}")]
    BadCommand(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("{code}: {description}")]
    BrokerError { code: String, description: String },

    #[error("Connection limit exceeded for this user")]
    ConnectionLimitExceeded,
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
