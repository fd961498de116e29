//! Multi-tenant gateway fronting a cTrader-style Open API broker link for
//! many downstream JSON clients.
//!
//! One upstream TLS session per trading account, fanned out to any number
//! of authenticated downstream WebSocket sessions through the modules in
//! [`modules`].

pub mod config;
pub mod domain;
pub mod error;
pub mod modules;

pub use config::Config;
pub use error::{ClientFacingError, CodecError, CredentialError, GatewayError, Result, UpstreamError};
