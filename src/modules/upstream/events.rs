//! Events emitted by an `UpstreamSession` toward its owning `DownstreamSession`.

use crate::domain::{AccountSnapshot, Position};
use crate::error::{ClientFacingError, UpstreamError};

#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    Connected,
    ApplicationAuthenticated,
    AccountAuthorized(AccountSnapshot),
    PositionsUpdated(Vec<Position>),
    ExecutionEvent(ExecutionEventData),
    SpotEvent(SpotEventData),
    Error(ClientFacingError),
    Disconnected { code: u16, reason: String },
}

#[derive(Debug, Clone)]
pub struct ExecutionEventData {
    pub order_id: i64,
    pub position_id: i64,
    pub execution_type: String,
}

#[derive(Debug, Clone)]
pub struct SpotEventData {
    pub symbol_id: i64,
    pub bid: f64,
    pub ask: f64,
}

impl From<UpstreamError> for UpstreamEvent {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::UpstreamClosed { code, reason } => {
                UpstreamEvent::Disconnected { code, reason }
            }
            other => UpstreamEvent::Error(ClientFacingError::PreconditionFailed(other.to_string())),
        }
    }
}
