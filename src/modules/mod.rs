//! Gateway modules
//!
//! - `codec`: broker wire format (length-prefixed protobuf envelopes)
//! - `upstream`: broker-side session, handshake state machine, reconnection
//! - `credentials`: per-tenant OAuth token cache
//! - `downstream`: client-facing JSON/WebSocket protocol
//! - `gateway`: accept loop and health/metrics surface
//! - `security`: secret redaction
//! - `utils`: backoff/retry helpers

pub mod codec;
pub mod credentials;
pub mod downstream;
pub mod gateway;
pub mod security;
pub mod upstream;
pub mod utils;
