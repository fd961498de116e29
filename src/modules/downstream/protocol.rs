//! JSON wire protocol between a client and its downstream session.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client -> server envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Server -> client envelope. `timestamp` is milliseconds since the Unix
/// epoch, not an RFC3339 string, so clients can compare it as a plain number.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub timestamp: i64,
}

impl ServerMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// The set of commands a client may send. `ClientMessage::kind` is matched
/// against these; anything else is a `ClientFacingError::BadCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Authenticate,
    Connect,
    Disconnect,
    Subscribe,
    Unsubscribe,
    Order,
    ClosePosition,
    Ping,
}

impl Command {
    pub fn parse(kind: &str) -> Option<Self> {
        Some(match kind {
            "authenticate" => Self::Authenticate,
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "subscribe" => Self::Subscribe,
            "unsubscribe" => Self::Unsubscribe,
            "order" => Self::Order,
            "closePosition" => Self::ClosePosition,
            "ping" => Self::Ping,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatePayload {
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectPayload {
    #[serde(default)]
    pub ctid_trader_account_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribePayload {
    pub symbol_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    pub symbol_id: i64,
    pub side: String,
    pub volume: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePositionPayload {
    pub position_id: String,
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_does_not_parse() {
        assert!(Command::parse("eval").is_none());
    }

    #[test]
    fn known_commands_round_trip_by_name() {
        assert_eq!(Command::parse("closePosition"), Some(Command::ClosePosition));
        assert_eq!(Command::parse("ping"), Some(Command::Ping));
    }
}
