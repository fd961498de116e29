//! Configuration module for the gateway
//!
//! Loads configuration from environment variables and .env file.

use crate::error::{GatewayError, Result};
use serde::Deserialize;
use std::env;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub broker: BrokerConfig,
    pub session: SessionConfig,
    pub gateway: GatewayListenConfig,
    pub store: StoreConfig,
    pub log_level: String,
}

/// Broker connection parameters (C2)
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub client_secret: String,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub max_frame_bytes: usize,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

/// Per-downstream-session limits (C4)
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub max_connections_per_user: usize,
    pub message_rate_limit: usize,
    pub rate_limit_window_ms: u64,
    pub max_frame_bytes: usize,
}

/// Gateway listen settings (C5)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayListenConfig {
    pub listen_port: u16,
    pub health_port: u16,
}

/// External credential store settings (C6)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub service_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            broker: BrokerConfig {
                host: get_env("BROKER_HOST")?,
                port: get_env_or("BROKER_PORT", "5035").parse().unwrap_or(5035),
                client_id: get_env("BROKER_CLIENT_ID")?,
                client_secret: get_env("BROKER_CLIENT_SECRET")?,
                ping_interval_ms: get_env_or("PING_INTERVAL_MS", "30000")
                    .parse()
                    .unwrap_or(30_000),
                ping_timeout_ms: get_env_or("PING_TIMEOUT_MS", "10000")
                    .parse()
                    .unwrap_or(10_000),
                reconnect_interval_ms: get_env_or("RECONNECT_INTERVAL_MS", "1000")
                    .parse()
                    .unwrap_or(1_000),
                max_reconnect_attempts: get_env_or("MAX_RECONNECT_ATTEMPTS", "5")
                    .parse()
                    .unwrap_or(5),
                max_frame_bytes: get_env_or("MAX_FRAME_BYTES", "1048576")
                    .parse()
                    .unwrap_or(1024 * 1024),
                request_timeout_ms: get_env_or("REQUEST_TIMEOUT_MS", "45000")
                    .parse()
                    .unwrap_or(45_000),
                connect_timeout_ms: get_env_or("CONNECT_TIMEOUT_MS", "60000")
                    .parse()
                    .unwrap_or(60_000),
            },
            session: SessionConfig {
                max_connections_per_user: get_env_or("MAX_CONNECTIONS_PER_USER", "5")
                    .parse()
                    .unwrap_or(5),
                message_rate_limit: get_env_or("MESSAGE_RATE_LIMIT", "100")
                    .parse()
                    .unwrap_or(100),
                rate_limit_window_ms: get_env_or("RATE_LIMIT_WINDOW_MS", "1000")
                    .parse()
                    .unwrap_or(1_000),
                max_frame_bytes: get_env_or("DOWNSTREAM_MAX_FRAME_BYTES", "1048576")
                    .parse()
                    .unwrap_or(1024 * 1024),
            },
            gateway: GatewayListenConfig {
                listen_port: get_env_or("LISTEN_PORT", "8080").parse().unwrap_or(8080),
                health_port: get_env_or("HEALTH_PORT", "9090").parse().unwrap_or(9090),
            },
            store: StoreConfig {
                url: get_env_or("STORE_URL", ""),
                service_key: get_env_or("STORE_SERVICE_KEY", ""),
            },
            log_level: get_env_or("RUST_LOG", "info"),
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.is_empty() {
            return Err(GatewayError::Config("BROKER_HOST is required".into()));
        }
        if self.broker.port == 0 {
            return Err(GatewayError::Config("BROKER_PORT must be non-zero".into()));
        }
        if self.broker.client_id.is_empty() || self.broker.client_secret.is_empty() {
            return Err(GatewayError::Config(
                "BROKER_CLIENT_ID and BROKER_CLIENT_SECRET are required".into(),
            ));
        }
        if self.session.message_rate_limit == 0 {
            return Err(GatewayError::Config(
                "MESSAGE_RATE_LIMIT must be positive".into(),
            ));
        }
        if self.broker.max_reconnect_attempts == 0 {
            return Err(GatewayError::Config(
                "MAX_RECONNECT_ATTEMPTS must be positive".into(),
            ));
        }
        if self.store.url.is_empty() {
            tracing::warn!("STORE_URL not set — credential store calls will fail at runtime");
        }
        Ok(())
    }
}

/// Get required environment variable
fn get_env(key: &str) -> Result<String> {
    env::var(key)
        .map_err(|_| GatewayError::Config(format!("Missing environment variable: {}", key)))
}

/// Get environment variable with default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_validation() {
        let config = Config {
            broker: BrokerConfig {
                host: "demo.ctraderapi.com".into(),
                port: 5035,
                client_id: "client".into(),
                client_secret: "secret".into(),
                ping_interval_ms: 30_000,
                ping_timeout_ms: 10_000,
                reconnect_interval_ms: 1_000,
                max_reconnect_attempts: 5,
                max_frame_bytes: 1024 * 1024,
                request_timeout_ms: 45_000,
                connect_timeout_ms: 60_000,
            },
            session: SessionConfig {
                max_connections_per_user: 5,
                message_rate_limit: 100,
                rate_limit_window_ms: 1_000,
                max_frame_bytes: 1024 * 1024,
            },
            gateway: GatewayListenConfig {
                listen_port: 8080,
                health_port: 9090,
            },
            store: StoreConfig {
                url: "https://store.example.com".into(),
                service_key: "key".into(),
            },
            log_level: "info".into(),
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_reads_broker_host() {
        let _lock = ENV_LOCK.lock().expect("env lock");
        env::set_var("BROKER_HOST", "demo.ctraderapi.com");
        env::set_var("BROKER_CLIENT_ID", "client");
        env::set_var("BROKER_CLIENT_SECRET", "secret");
        env::set_var("STORE_URL", "https://store.example.com");

        let config = Config::from_env().expect("config");
        assert_eq!(config.broker.host, "demo.ctraderapi.com");
        assert_eq!(config.broker.port, 5035);

        env::remove_var("BROKER_HOST");
        env::remove_var("BROKER_CLIENT_ID");
        env::remove_var("BROKER_CLIENT_SECRET");
        env::remove_var("STORE_URL");
    }

    #[test]
    fn test_missing_broker_host_fails() {
        let _lock = ENV_LOCK.lock().expect("env lock");
        env::remove_var("BROKER_HOST");
        assert!(Config::from_env().is_err());
    }
}
