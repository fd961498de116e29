//! Accept loop for downstream client connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::modules::credentials::CredentialCache;
use crate::modules::downstream::{self, DownstreamDeps};
use crate::modules::gateway::health::GatewayMetrics;
use crate::modules::gateway::registry::ConnectionRegistry;
use crate::modules::upstream::UpstreamSessionConfig;

/// What the gateway holds onto for one live downstream session: a way to
/// tell it to shut down, and a handle to wait for (or force-abort) it.
struct SessionHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

pub struct Gateway {
    config: Config,
    credential_cache: Arc<CredentialCache>,
    metrics: Arc<GatewayMetrics>,
    connection_registry: Arc<ConnectionRegistry>,
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl Gateway {
    pub fn new(config: Config, credential_cache: Arc<CredentialCache>, metrics: Arc<GatewayMetrics>) -> Self {
        let connection_registry = Arc::new(ConnectionRegistry::new(config.session.max_connections_per_user));
        Self {
            config,
            credential_cache,
            metrics,
            connection_registry,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Accept connections until `shutdown` resolves, then stop accepting new
    /// work and tear every live downstream session down.
    pub async fn run(&self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.gateway.listen_port)).await?;
        info!("Gateway listening on port {}", self.config.gateway.listen_port);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    self.spawn_session(stream, peer);
                }
                _ = &mut shutdown => {
                    info!("Gateway shutting down, no longer accepting connections");
                    self.shutdown_sessions().await;
                    return Ok(());
                }
            }
        }
    }

    /// Signal every live session to tear down its upstream and close its
    /// transport with code 1000, then wait up to 5s for them to quiesce.
    /// Anything still alive past that is force-aborted.
    async fn shutdown_sessions(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        if handles.is_empty() {
            return;
        }

        let mut aborts: Vec<AbortHandle> = Vec::with_capacity(handles.len());
        let mut joins: Vec<JoinHandle<()>> = Vec::with_capacity(handles.len());
        for handle in handles {
            let _ = handle.shutdown_tx.send(());
            aborts.push(handle.join.abort_handle());
            joins.push(handle.join);
        }

        if tokio::time::timeout(Duration::from_secs(5), futures_util::future::join_all(joins))
            .await
            .is_err()
        {
            warn!("Downstream sessions did not quiesce within 5s, force-aborting");
            for abort in aborts {
                abort.abort();
            }
        }
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, peer: std::net::SocketAddr) {
        let deps = DownstreamDeps {
            credential_cache: self.credential_cache.clone(),
            broker_client_id: self.config.broker.client_id.clone(),
            broker_client_secret: self.config.broker.client_secret.clone(),
            upstream_config: UpstreamSessionConfig {
                host: self.config.broker.host.clone(),
                port: self.config.broker.port,
                ping_interval_ms: self.config.broker.ping_interval_ms,
                ping_timeout_ms: self.config.broker.ping_timeout_ms,
                reconnect_interval_ms: self.config.broker.reconnect_interval_ms,
                max_reconnect_attempts: self.config.broker.max_reconnect_attempts,
                max_frame_bytes: self.config.broker.max_frame_bytes,
                request_timeout_ms: self.config.broker.request_timeout_ms,
                connect_timeout_ms: self.config.broker.connect_timeout_ms,
            },
            rate_limit: crate::modules::downstream::RateLimiterConfig {
                max_requests: self.config.session.message_rate_limit,
                window: std::time::Duration::from_millis(self.config.session.rate_limit_window_ms),
            },
            connection_registry: self.connection_registry.clone(),
            metrics: self.metrics.clone(),
        };
        let metrics = self.metrics.clone();
        let sessions = self.sessions.clone();
        let session_id = downstream::session::generate_session_id();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_session_id = session_id.clone();
        let task_sessions = sessions.clone();
        let join = tokio::spawn(async move {
            info!("Accepted downstream connection from {}", peer);
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake with {} failed: {}", peer, e);
                    task_sessions.lock().unwrap().remove(&task_session_id);
                    return;
                }
            };
            metrics.session_opened();
            let was_authenticated = downstream::session::run(ws, deps, task_session_id.clone(), shutdown_rx).await;
            metrics.session_closed(was_authenticated);
            task_sessions.lock().unwrap().remove(&task_session_id);
        });

        sessions.lock().unwrap().insert(session_id, SessionHandle { shutdown_tx, join });
    }
}
