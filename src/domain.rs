//! Shared value types passed between the upstream and downstream halves of a
//! session pair.
//!
//! Monetary and price fields use the broker's integer unit scaling; see
//! `UNIT_SCALE`/`PRICE_SCALE`. Account and position ids stay 64-bit end to
//! end — never narrow them.

use serde::{Deserialize, Serialize};

/// Divisor applied to integer broker-unit balances (balance, equity, margin).
pub const UNIT_SCALE: f64 = 100.0;

/// Divisor applied to integer broker-unit prices (bid/ask, entry/current price).
pub const PRICE_SCALE: f64 = 100_000.0;

/// Trading environment reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Demo,
    Live,
}

impl Environment {
    pub fn server_endpoint(&self, broker_host: &str) -> String {
        match self {
            Self::Demo => format!("demo.{}", broker_host),
            Self::Live => format!("live.{}", broker_host),
        }
    }

    pub fn from_is_live(is_live: bool) -> Self {
        if is_live {
            Self::Live
        } else {
            Self::Demo
        }
    }
}

/// Order side (direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Account snapshot produced by the upstream session after reconciliation.
///
/// Immutable; passed by copy/clone between components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(with = "id_as_string")]
    pub account_id: i64,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub margin_level: f64,
    pub currency: String,
    pub leverage: f64,
    pub broker_name: String,
    pub environment: Environment,
}

/// A single open position. Event-sourced: each `positionUpdate` replaces the
/// client's prior view of that position wholesale, no incremental patching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    #[serde(with = "id_as_string")]
    pub symbol_id: i64,
    pub side: Side,
    pub volume: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_profit: f64,
    pub swap: f64,
    pub commission: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub open_time: chrono::DateTime<chrono::Utc>,
}

/// Serializes 64-bit ids as decimal strings on the downstream JSON wire so
/// clients whose numeric type is an IEEE-754 double never lose precision.
mod id_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_snapshot_serializes_id_as_string() {
        let snapshot = AccountSnapshot {
            account_id: 123456789012345,
            balance: 10_000.0,
            equity: 10_050.0,
            margin: 500.0,
            free_margin: 9_550.0,
            margin_level: 2010.0,
            currency: "USD".into(),
            leverage: 100.0,
            broker_name: "Fusion Markets".into(),
            environment: Environment::Demo,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["account_id"], "123456789012345");
    }

    #[test]
    fn environment_from_is_live() {
        assert_eq!(Environment::from_is_live(true), Environment::Live);
        assert_eq!(Environment::from_is_live(false), Environment::Demo);
    }
}
