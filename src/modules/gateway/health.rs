//! `/health` and `/metrics` JSON endpoints.
//!
//! The teacher exposed a Prometheus text page from a hand-rolled registry;
//! this gateway has no metrics backend of its own, so both endpoints return
//! plain JSON shaped for a simple external supervisor instead of the
//! Prometheus exposition format.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub struct GatewayMetrics {
    started_at: Instant,
    active_sessions: AtomicU64,
    authenticated_sessions: AtomicU64,
    upstream_connected: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started_at: Instant::now(),
            active_sessions: AtomicU64::new(0),
            authenticated_sessions: AtomicU64::new(0),
            upstream_connected: AtomicU64::new(0),
        })
    }

    pub fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// `was_authenticated` reflects whether this session ever completed
    /// `authenticate` — callers decrement the authenticated counter only
    /// when that happened, keeping the two counters consistent.
    pub fn session_closed(&self, was_authenticated: bool) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        if was_authenticated {
            self.authenticated_sessions.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn session_authenticated(&self) {
        self.authenticated_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream_connected(&self) {
        self.upstream_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream_disconnected(&self) {
        self.upstream_connected.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Best-effort resident set size in bytes, read from `/proc/self/status`.
/// Returns 0 off Linux or if the read fails; this is a diagnostic figure; it
/// is never load-bearing for gateway behavior.
fn resident_memory_bytes() -> u64 {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return 0;
    };
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.trim().split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn router(metrics: Arc<GatewayMetrics>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn health_handler(State(metrics): State<Arc<GatewayMetrics>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "clients": metrics.active_sessions.load(Ordering::Relaxed),
        "timestamp": now_millis(),
    }))
}

async fn metrics_handler(State(metrics): State<Arc<GatewayMetrics>>) -> Json<serde_json::Value> {
    Json(json!({
        "totalConnections": metrics.active_sessions.load(Ordering::Relaxed),
        "authenticatedConnections": metrics.authenticated_sessions.load(Ordering::Relaxed),
        "ctraderConnections": metrics.upstream_connected.load(Ordering::Relaxed),
        "uptime": metrics.started_at.elapsed().as_secs(),
        "memory": resident_memory_bytes(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_counters_track_open_and_close() {
        let metrics = GatewayMetrics::new();
        metrics.session_opened();
        metrics.session_opened();
        metrics.session_closed(false);
        assert_eq!(metrics.active_sessions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn authenticated_counter_only_decrements_for_authenticated_sessions() {
        let metrics = GatewayMetrics::new();
        metrics.session_opened();
        metrics.session_authenticated();
        metrics.session_closed(true);
        assert_eq!(metrics.authenticated_sessions.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn upstream_counter_tracks_connect_and_disconnect() {
        let metrics = GatewayMetrics::new();
        metrics.upstream_connected();
        metrics.upstream_connected();
        metrics.upstream_disconnected();
        assert_eq!(metrics.upstream_connected.load(Ordering::Relaxed), 1);
    }
}
