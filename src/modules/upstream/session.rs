//! Upstream (broker) session: one TLS connection, handshake state machine,
//! heartbeat/liveness, request correlation and reconnection with backoff.

use prost::Message as ProstMessage;
use rustls::pki_types::ServerName;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_rustls::{client::TlsStream, TlsConnector};
use tracing::{debug, error, info, warn};

use crate::domain::{AccountSnapshot, Environment, Position, Side};
use crate::error::UpstreamError;
use crate::modules::codec::messages::{
    AccountAuthReq, ApplicationAuthReq, ClosePositionReq, HeartbeatEvent, NewOrderReq, ReconcileReq,
    SubscribeSpotsReq, UnsubscribeSpotsReq, VersionReq,
};
use crate::modules::codec::payload_type::classify;
use crate::modules::codec::{BasePayloadType, FrameReassembler, PayloadKind, ProtoMessage, VendorPayloadType};
use crate::modules::upstream::correlation::CorrelationTable;
use crate::modules::upstream::events::{ExecutionEventData, SpotEventData, UpstreamEvent};

/// Handshake stage, per the state machine: Disconnected -> TcpConnecting ->
/// WireOpen -> AwaitingAppAuth -> AppAuthed -> AccountAuthed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Disconnected,
    TcpConnecting,
    WireOpen,
    AwaitingAppAuth,
    AppAuthed,
    AccountAuthed,
}

/// Credentials the upstream session authenticates with. Borrowed from the
/// credential cache at `connect()` time.
#[derive(Debug, Clone)]
pub struct UpstreamCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct UpstreamSessionConfig {
    pub host: String,
    pub port: u16,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub max_frame_bytes: usize,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

enum SessionCommand {
    SendOrder(NewOrderReq),
    ClosePosition(ClosePositionReq),
    SubscribeSpots(i64),
    UnsubscribeSpots(i64),
    RebindAccount(i64),
    Disconnect,
}

/// One TLS connection to the broker, with the handshake/heartbeat/reconnect
/// machinery driven by a single supervising task.
pub struct UpstreamSession {
    state: Arc<RwLock<HandshakeState>>,
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    reconnect_attempts: Arc<AtomicU32>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl UpstreamSession {
    /// Start the session: spawns the supervising task, which immediately
    /// begins the TcpConnecting -> ... -> AccountAuthed sequence.
    pub fn connect(
        config: UpstreamSessionConfig,
        credentials: UpstreamCredentials,
        account_id: i64,
        event_tx: mpsc::UnboundedSender<UpstreamEvent>,
    ) -> Self {
        let state = Arc::new(RwLock::new(HandshakeState::Disconnected));
        let reconnect_attempts = Arc::new(AtomicU32::new(0));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let supervisor = tokio::spawn(run_supervisor(
            config,
            credentials,
            account_id,
            event_tx,
            state.clone(),
            reconnect_attempts.clone(),
            cmd_rx,
        ));

        Self {
            state,
            cmd_tx,
            reconnect_attempts,
            supervisor,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        *self.state.read().await == HandshakeState::AccountAuthed
    }

    pub async fn state(&self) -> HandshakeState {
        *self.state.read().await
    }

    pub fn send_order(&self, req: NewOrderReq) {
        let _ = self.cmd_tx.send(SessionCommand::SendOrder(req));
    }

    pub fn close_position(&self, req: ClosePositionReq) {
        let _ = self.cmd_tx.send(SessionCommand::ClosePosition(req));
    }

    pub fn subscribe_spots(&self, symbol_id: i64) {
        let _ = self.cmd_tx.send(SessionCommand::SubscribeSpots(symbol_id));
    }

    pub fn unsubscribe_spots(&self, symbol_id: i64) {
        let _ = self.cmd_tx.send(SessionCommand::UnsubscribeSpots(symbol_id));
    }

    pub fn rebind_account(&self, account_id: i64) {
        let _ = self.cmd_tx.send(SessionCommand::RebindAccount(account_id));
    }

    /// Explicit disconnect suppresses further reconnection by pinning the
    /// attempt counter at the configured cap.
    pub fn disconnect(&self) {
        self.reconnect_attempts.store(u32::MAX, Ordering::SeqCst);
        let _ = self.cmd_tx.send(SessionCommand::Disconnect);
    }
}

impl Drop for UpstreamSession {
    fn drop(&mut self) {
        self.reconnect_attempts.store(u32::MAX, Ordering::SeqCst);
        self.supervisor.abort();
    }
}

async fn run_supervisor(
    config: UpstreamSessionConfig,
    credentials: UpstreamCredentials,
    mut account_id: i64,
    event_tx: mpsc::UnboundedSender<UpstreamEvent>,
    state: Arc<RwLock<HandshakeState>>,
    reconnect_attempts: Arc<AtomicU32>,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    loop {
        *state.write().await = HandshakeState::TcpConnecting;

        let connect_result = run_connection(
            &config,
            &credentials,
            &event_tx,
            &state,
            &reconnect_attempts,
            &mut cmd_rx,
            &mut account_id,
        )
        .await;

        match connect_result {
            Ok(ExitReason::ExplicitDisconnect) => {
                *state.write().await = HandshakeState::Disconnected;
                info!("Upstream session disconnected explicitly");
                return;
            }
            Ok(ExitReason::SocketClosed { code, reason }) => {
                *state.write().await = HandshakeState::Disconnected;
                let _ = event_tx.send(UpstreamEvent::Disconnected {
                    code,
                    reason: reason.clone(),
                });
                warn!("Upstream socket closed (code {}): {}", code, reason);
            }
            Err(UpstreamError::HandshakeTimeout) => {
                *state.write().await = HandshakeState::Disconnected;
                warn!("Upstream connect timed out after {}ms", config.connect_timeout_ms);
            }
            Err(err) => {
                *state.write().await = HandshakeState::Disconnected;
                warn!("Upstream connection attempt failed: {}", err);
            }
        }

        let attempt = reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > config.max_reconnect_attempts {
            error!(
                "Reconnect attempts exhausted ({}/{}); giving up",
                attempt.min(config.max_reconnect_attempts),
                config.max_reconnect_attempts
            );
            let _ = event_tx.send(UpstreamEvent::Disconnected {
                code: 1000,
                reason: "max reconnect attempts exhausted".into(),
            });
            return;
        }

        let delay_ms = (config.reconnect_interval_ms * attempt as u64).min(30_000);
        debug!("Reconnecting in {}ms (attempt {})", delay_ms, attempt);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

enum ExitReason {
    ExplicitDisconnect,
    SocketClosed { code: u16, reason: String },
}

enum StepOutcome {
    Continue,
    Exit(ExitReason),
}

/// Connect and run the handshake up to AccountAuthed under `connect_timeout_ms`
/// (spec: "60s to reach AccountAuthed"); once reached, drive the steady-state
/// receive loop with no overall deadline — only the per-request and
/// per-heartbeat timeouts inside it apply from then on.
async fn run_connection(
    config: &UpstreamSessionConfig,
    credentials: &UpstreamCredentials,
    event_tx: &mpsc::UnboundedSender<UpstreamEvent>,
    state: &Arc<RwLock<HandshakeState>>,
    reconnect_attempts: &Arc<AtomicU32>,
    cmd_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    bound_account_id: &mut i64,
) -> Result<ExitReason, UpstreamError> {
    let connect_deadline = Duration::from_millis(config.connect_timeout_ms);

    let setup = timeout(connect_deadline, async {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;

        let mut root_store = rustls::RootCertStore::empty();
        for cert in rustls_native_certs::load_native_certs()
            .map_err(|e| UpstreamError::ConnectionFailed(format!("loading native certs: {e}")))?
        {
            let _ = root_store.add(cert);
        }
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(config.host.clone())
            .map_err(|e| UpstreamError::ConnectionFailed(format!("invalid server name: {e}")))?;

        let mut stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| UpstreamError::ConnectionFailed(format!("TLS handshake: {e}")))?;

        info!("TLS connection established to {}:{}", config.host, config.port);
        *state.write().await = HandshakeState::WireOpen;
        let _ = event_tx.send(UpstreamEvent::Connected);

        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let mut correlation = CorrelationTable::new();

        send_tracked(
            &mut stream,
            &mut correlation,
            "version",
            VendorPayloadType::VersionRes as i32,
            request_timeout,
            ProtoMessage::new(VendorPayloadType::VersionReq as i32, VersionReq {}),
        )
        .await?;
        *state.write().await = HandshakeState::AwaitingAppAuth;

        Ok::<_, UpstreamError>((stream, correlation, request_timeout))
    })
    .await;

    let (mut stream, mut correlation, request_timeout) = match setup {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(UpstreamError::HandshakeTimeout),
    };

    let mut reassembler = FrameReassembler::new(config.max_frame_bytes);
    let mut heartbeat = tokio::time::interval(Duration::from_millis(config.ping_interval_ms));
    heartbeat.tick().await; // first tick fires immediately; consume it
    let mut pong_deadline: Option<tokio::time::Instant> = None;
    let mut read_buf = [0u8; 8192];
    let mut reap_tick = tokio::time::interval(Duration::from_secs(1));

    let handshake = timeout(connect_deadline, async {
        loop {
            if *state.read().await == HandshakeState::AccountAuthed {
                return Ok(None);
            }
            match connection_step(
                &mut stream,
                &mut reassembler,
                &mut correlation,
                &mut heartbeat,
                &mut pong_deadline,
                &mut read_buf,
                &mut reap_tick,
                cmd_rx,
                state,
                event_tx,
                credentials,
                bound_account_id,
                request_timeout,
                reconnect_attempts,
                config.ping_timeout_ms,
            )
            .await?
            {
                StepOutcome::Continue => {}
                StepOutcome::Exit(reason) => return Ok(Some(reason)),
            }
        }
    })
    .await;

    match handshake {
        Ok(Ok(Some(reason))) => return Ok(reason),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(UpstreamError::HandshakeTimeout),
    }

    loop {
        match connection_step(
            &mut stream,
            &mut reassembler,
            &mut correlation,
            &mut heartbeat,
            &mut pong_deadline,
            &mut read_buf,
            &mut reap_tick,
            cmd_rx,
            state,
            event_tx,
            credentials,
            bound_account_id,
            request_timeout,
            reconnect_attempts,
            config.ping_timeout_ms,
        )
        .await?
        {
            StepOutcome::Continue => {}
            StepOutcome::Exit(reason) => return Ok(reason),
        }
    }
}

/// One iteration of the read/heartbeat/command/reaper select, shared by both
/// the timed handshake phase and the untimed steady-state loop.
#[allow(clippy::too_many_arguments)]
async fn connection_step(
    stream: &mut TlsStream<TcpStream>,
    reassembler: &mut FrameReassembler,
    correlation: &mut CorrelationTable,
    heartbeat: &mut tokio::time::Interval,
    pong_deadline: &mut Option<tokio::time::Instant>,
    read_buf: &mut [u8],
    reap_tick: &mut tokio::time::Interval,
    cmd_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    state: &Arc<RwLock<HandshakeState>>,
    event_tx: &mpsc::UnboundedSender<UpstreamEvent>,
    credentials: &UpstreamCredentials,
    bound_account_id: &mut i64,
    request_timeout: Duration,
    reconnect_attempts: &Arc<AtomicU32>,
    ping_timeout_ms: u64,
) -> Result<StepOutcome, UpstreamError> {
    let pong_sleep = async {
        match *pong_deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        read_result = stream.read(read_buf) => {
            let n = read_result.map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;
            if n == 0 {
                return Ok(StepOutcome::Exit(ExitReason::SocketClosed { code: 1006, reason: "EOF".into() }));
            }
            *pong_deadline = None; // any inbound frame cancels the heartbeat deadline

            let messages = reassembler
                .push(&read_buf[..n])
                .map_err(|e| UpstreamError::Protocol(e.to_string()))?;
            for message in messages {
                handle_inbound(
                    message,
                    correlation,
                    state,
                    event_tx,
                    stream,
                    credentials,
                    *bound_account_id,
                    request_timeout,
                    reconnect_attempts,
                ).await?;
            }
            Ok(StepOutcome::Continue)
        }
        _ = heartbeat.tick() => {
            send(stream, ProtoMessage::new(BasePayloadType::HeartbeatEvent as i32, HeartbeatEvent {})).await?;
            *pong_deadline = Some(tokio::time::Instant::now() + Duration::from_millis(ping_timeout_ms));
            Ok(StepOutcome::Continue)
        }
        _ = pong_sleep => {
            Ok(StepOutcome::Exit(ExitReason::SocketClosed { code: 1000, reason: "Ping timeout".into() }))
        }
        cmd = cmd_rx.recv() => {
            match cmd {
                Some(SessionCommand::SendOrder(req)) => {
                    send_tracked(
                        stream, correlation, "newOrder",
                        VendorPayloadType::ExecutionEvent as i32, request_timeout,
                        ProtoMessage::new(VendorPayloadType::NewOrderReq as i32, req),
                    ).await?;
                    Ok(StepOutcome::Continue)
                }
                Some(SessionCommand::ClosePosition(req)) => {
                    send_tracked(
                        stream, correlation, "closePosition",
                        VendorPayloadType::ExecutionEvent as i32, request_timeout,
                        ProtoMessage::new(VendorPayloadType::ClosePositionReq as i32, req),
                    ).await?;
                    Ok(StepOutcome::Continue)
                }
                Some(SessionCommand::SubscribeSpots(symbol_id)) => {
                    let req = SubscribeSpotsReq {
                        ctid_trader_account_id: *bound_account_id,
                        symbol_id: vec![symbol_id],
                    };
                    send(stream, ProtoMessage::new(VendorPayloadType::SubscribeSpotsReq as i32, req)).await?;
                    Ok(StepOutcome::Continue)
                }
                Some(SessionCommand::UnsubscribeSpots(symbol_id)) => {
                    let req = UnsubscribeSpotsReq {
                        ctid_trader_account_id: *bound_account_id,
                        symbol_id: vec![symbol_id],
                    };
                    send(stream, ProtoMessage::new(VendorPayloadType::UnsubscribeSpotsReq as i32, req)).await?;
                    Ok(StepOutcome::Continue)
                }
                Some(SessionCommand::RebindAccount(new_account_id)) => {
                    *bound_account_id = new_account_id;
                    let req = AccountAuthReq {
                        ctid_trader_account_id: new_account_id,
                        access_token: credentials.access_token.clone(),
                    };
                    send_tracked(
                        stream, correlation, "rebindAccount",
                        VendorPayloadType::AccountAuthRes as i32, request_timeout,
                        ProtoMessage::new(VendorPayloadType::AccountAuthReq as i32, req),
                    ).await?;
                    Ok(StepOutcome::Continue)
                }
                Some(SessionCommand::Disconnect) | None => {
                    let _ = stream.shutdown().await;
                    Ok(StepOutcome::Exit(ExitReason::ExplicitDisconnect))
                }
            }
        }
        _ = reap_tick.tick() => {
            for err in correlation.reap_expired() {
                let _ = event_tx.send(UpstreamEvent::from(err));
            }
            Ok(StepOutcome::Continue)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_inbound(
    message: ProtoMessage,
    correlation: &mut CorrelationTable,
    state: &Arc<RwLock<HandshakeState>>,
    event_tx: &mpsc::UnboundedSender<UpstreamEvent>,
    stream: &mut TlsStream<TcpStream>,
    credentials: &UpstreamCredentials,
    account_id: i64,
    request_timeout: Duration,
    reconnect_attempts: &Arc<AtomicU32>,
) -> Result<(), UpstreamError> {
    correlation.resolve(&message);

    match classify(message.payload_type) {
        PayloadKind::Vendor(VendorPayloadType::VersionRes) => {
            let req = ApplicationAuthReq {
                client_id: credentials.client_id.clone(),
                client_secret: credentials.client_secret.clone(),
            };
            send_tracked(
                stream, correlation, "applicationAuth",
                VendorPayloadType::ApplicationAuthRes as i32, request_timeout,
                ProtoMessage::new(VendorPayloadType::ApplicationAuthReq as i32, req),
            ).await?;
        }
        PayloadKind::Vendor(VendorPayloadType::ApplicationAuthRes) => {
            *state.write().await = HandshakeState::AppAuthed;
            let _ = event_tx.send(UpstreamEvent::ApplicationAuthenticated);

            let req = AccountAuthReq {
                ctid_trader_account_id: account_id,
                access_token: credentials.access_token.clone(),
            };
            send_tracked(
                stream, correlation, "accountAuth",
                VendorPayloadType::AccountAuthRes as i32, request_timeout,
                ProtoMessage::new(VendorPayloadType::AccountAuthReq as i32, req),
            ).await?;
        }
        PayloadKind::Vendor(VendorPayloadType::AccountAuthRes) => {
            *state.write().await = HandshakeState::AccountAuthed;
            // A consecutive-failure counter: reset it once a (re)connect
            // actually lands, so a long-lived session's occasional drop and
            // recovery never accumulates toward the reconnect cap.
            reconnect_attempts.store(0, Ordering::SeqCst);

            let req = ReconcileReq {
                ctid_trader_account_id: account_id,
            };
            send_tracked(
                stream, correlation, "reconcile",
                VendorPayloadType::ReconcileRes as i32, request_timeout,
                ProtoMessage::new(VendorPayloadType::ReconcileReq as i32, req),
            ).await?;
        }
        PayloadKind::Vendor(VendorPayloadType::ReconcileRes) => {
            if *state.read().await != HandshakeState::AccountAuthed {
                // Never emit domain events before AccountAuthed is reached.
                return Ok(());
            }
            if let Some(payload) = message.payload.as_deref() {
                if let Ok(res) = crate::modules::codec::messages::ReconcileRes::decode(payload) {
                    if let Some(trader) = res.trader.clone() {
                        let _ = event_tx.send(UpstreamEvent::AccountAuthorized(account_snapshot_from(&trader)));
                    }
                    let positions = res.position.iter().map(position_from).collect();
                    let _ = event_tx.send(UpstreamEvent::PositionsUpdated(positions));
                }
            }
        }
        PayloadKind::Vendor(VendorPayloadType::ExecutionEvent) => {
            if let Some(payload) = message.payload.as_deref() {
                if let Ok(exec) = crate::modules::codec::messages::ExecutionEvent::decode(payload) {
                    let _ = event_tx.send(UpstreamEvent::ExecutionEvent(ExecutionEventData {
                        order_id: exec.order_id,
                        position_id: exec.position_id,
                        execution_type: exec.execution_type,
                    }));
                }
            }
        }
        PayloadKind::Vendor(VendorPayloadType::SpotEvent) => {
            if let Some(payload) = message.payload.as_deref() {
                if let Ok(spot) = crate::modules::codec::messages::SpotEvent::decode(payload) {
                    let _ = event_tx.send(UpstreamEvent::SpotEvent(SpotEventData {
                        symbol_id: spot.symbol_id,
                        bid: spot.bid.unwrap_or(0) as f64 / crate::domain::PRICE_SCALE,
                        ask: spot.ask.unwrap_or(0) as f64 / crate::domain::PRICE_SCALE,
                    }));
                }
            }
        }
        PayloadKind::Vendor(VendorPayloadType::AccountErrorRes) => {
            if let Some(payload) = message.payload.as_deref() {
                if let Ok(err) = crate::modules::codec::messages::AccountErrorRes::decode(payload) {
                    let _ = event_tx.send(UpstreamEvent::Error(
                        crate::error::ClientFacingError::BrokerError {
                            code: err.error_code,
                            description: err.description,
                        },
                    ));
                }
            }
        }
        PayloadKind::Base(BasePayloadType::ErrorRes) => {
            if let Some(payload) = message.payload.as_deref() {
                if let Ok(err) = crate::modules::codec::messages::ErrorRes::decode(payload) {
                    let _ = event_tx.send(UpstreamEvent::Error(
                        crate::error::ClientFacingError::BrokerError {
                            code: err.error_code,
                            description: err.description.unwrap_or_default(),
                        },
                    ));
                }
            }
        }
        PayloadKind::Base(BasePayloadType::HeartbeatEvent) => {
            debug!("Heartbeat acknowledged by broker");
        }
        PayloadKind::Unknown(t) => {
            debug!("Dropping frame with unknown payload type {}", t);
        }
        _ => {}
    }

    Ok(())
}

fn account_snapshot_from(trader: &crate::modules::codec::messages::ReconcileTrader) -> AccountSnapshot {
    AccountSnapshot {
        account_id: trader.ctid_trader_account_id,
        balance: trader.balance as f64 / crate::domain::UNIT_SCALE,
        equity: trader.balance as f64 / crate::domain::UNIT_SCALE,
        margin: 0.0,
        free_margin: trader.balance as f64 / crate::domain::UNIT_SCALE,
        margin_level: 0.0,
        currency: trader.currency.clone().unwrap_or_else(|| "USD".to_string()),
        leverage: trader.leverage_in_cents as f64 / crate::domain::UNIT_SCALE,
        broker_name: trader.broker_name.clone().unwrap_or_default(),
        environment: Environment::from_is_live(trader.is_live),
    }
}

fn position_from(p: &crate::modules::codec::messages::ReconcilePosition) -> Position {
    Position {
        position_id: p.position_id.to_string(),
        symbol_id: p.symbol_id,
        side: if p.trade_side == 1 { Side::Buy } else { Side::Sell },
        volume: p.volume as f64 / crate::domain::UNIT_SCALE,
        entry_price: p.entry_price as f64 / crate::domain::PRICE_SCALE,
        current_price: p.current_price.unwrap_or(p.entry_price) as f64 / crate::domain::PRICE_SCALE,
        unrealized_profit: p.unrealized_profit.unwrap_or(0) as f64 / crate::domain::UNIT_SCALE,
        swap: p.swap.unwrap_or(0) as f64 / crate::domain::UNIT_SCALE,
        commission: p.commission.unwrap_or(0) as f64 / crate::domain::UNIT_SCALE,
        stop_loss: p.stop_loss.map(|v| v as f64 / crate::domain::PRICE_SCALE),
        take_profit: p.take_profit.map(|v| v as f64 / crate::domain::PRICE_SCALE),
        open_time: chrono::DateTime::from_timestamp(p.open_timestamp, 0).unwrap_or_else(chrono::Utc::now),
    }
}

async fn send(stream: &mut TlsStream<TcpStream>, message: ProtoMessage) -> Result<(), UpstreamError> {
    let encoded = message.encode_with_length();
    stream
        .write_all(&encoded)
        .await
        .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;
    Ok(())
}

/// Send a request and register interest in its correlated response, so an
/// unanswered request surfaces as a `RequestTimeout` via the reaper rather
/// than hanging forever.
async fn send_tracked(
    stream: &mut TlsStream<TcpStream>,
    correlation: &mut CorrelationTable,
    op: &str,
    expected_payload_type: i32,
    timeout: Duration,
    message: ProtoMessage,
) -> Result<(), UpstreamError> {
    let _rx = correlation.register(op, expected_payload_type, timeout);
    send(stream, message).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_states_are_ordered_distinctly() {
        assert_ne!(HandshakeState::Disconnected, HandshakeState::AccountAuthed);
    }
}
