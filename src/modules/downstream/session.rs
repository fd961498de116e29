//! One client connection: JSON command dispatch, rate limiting, transport
//! liveness (server-initiated ping/pong), and the
//! Unauth -> Authed -> UpstreamBound -> UpstreamAuthed state machine that
//! gates a client's access to its bound upstream session.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};

use crate::error::ClientFacingError;
use crate::modules::codec::messages::{ClosePositionReq, NewOrderReq};
use crate::modules::credentials::CredentialCache;
use crate::modules::downstream::protocol::{
    ClientMessage, ClosePositionPayload, Command, ConnectPayload, OrderPayload, ServerMessage,
    SubscribePayload,
};
use crate::modules::downstream::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::modules::gateway::{ConnectionRegistry, GatewayMetrics};
use crate::modules::upstream::{UpstreamCredentials, UpstreamEvent, UpstreamSession, UpstreamSessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamState {
    Unauth,
    Authed,
    UpstreamBound,
    UpstreamAuthed,
}

/// Everything a downstream session needs that it doesn't own itself.
#[derive(Clone)]
pub struct DownstreamDeps {
    pub credential_cache: Arc<CredentialCache>,
    pub broker_client_id: String,
    pub broker_client_secret: String,
    pub upstream_config: UpstreamSessionConfig,
    pub rate_limit: RateLimiterConfig,
    pub connection_registry: Arc<ConnectionRegistry>,
    pub metrics: Arc<GatewayMetrics>,
}

/// Monotonic millisecond plus a random suffix: unique, not globally ordered.
/// The gateway calls this once per accepted connection so it can key its
/// session map before the session task itself starts running.
pub(crate) fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();
    format!("{millis}-{suffix:08x}")
}

/// Drives one client's WebSocket connection until it disconnects or the
/// gateway asks it to shut down. `S` is whatever JSON-text transport the
/// gateway accepted the connection on. Returns whether the session ever
/// completed `authenticate`, so the caller can keep the gateway's
/// authenticated-session counter in sync.
pub async fn run<S>(
    mut ws: S,
    deps: DownstreamDeps,
    session_id: String,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> bool
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Sink<WsMessage> + Unpin,
{
    let mut state = DownstreamState::Unauth;
    let mut user_id: Option<String> = None;
    let mut upstream: Option<UpstreamSession> = None;
    let mut bound_account_id: Option<i64> = None;
    let rate_limiter = RateLimiter::new(deps.rate_limit.clone());
    let (upstream_event_tx, mut upstream_event_rx) = mpsc::unbounded_channel::<UpstreamEvent>();

    let msg = ServerMessage::new("connected", json!({ "sessionId": session_id }));
    let _ = ws
        .send(WsMessage::Text(serde_json::to_string(&msg).unwrap_or_default()))
        .await;

    // Transport liveness: ping the client at the configured interval; if no
    // pong arrives within twice the configured ping timeout, force-close.
    let ping_interval = Duration::from_millis(deps.upstream_config.ping_interval_ms);
    let pong_deadline = Duration::from_millis(deps.upstream_config.ping_timeout_ms * 2);
    let mut ping_ticker = tokio::time::interval(ping_interval);
    ping_ticker.tick().await; // first tick fires immediately; consume it
    let mut liveness_check = tokio::time::interval(Duration::from_secs(1));
    let mut last_pong_at = Instant::now();

    loop {
        tokio::select! {
            incoming = ws.next() => {
                let Some(incoming) = incoming else { break };
                let text = match incoming {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Pong(_)) => { last_pong_at = Instant::now(); continue; }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                };

                if !rate_limiter.check().await {
                    let _ = send_error(&mut ws, ClientFacingError::RateLimited).await;
                    continue;
                }

                let Ok(message) = serde_json::from_str::<ClientMessage>(&text) else {
                    let _ = send_error(&mut ws, ClientFacingError::BadCommand("invalid JSON envelope".into())).await;
                    continue;
                };

                let Some(command) = Command::parse(&message.kind) else {
                    let _ = send_error(&mut ws, ClientFacingError::BadCommand(message.kind.clone())).await;
                    continue;
                };

                if let Err(err) = dispatch(
                    command,
                    message,
                    &mut state,
                    &mut user_id,
                    &mut upstream,
                    &mut bound_account_id,
                    &deps,
                    upstream_event_tx.clone(),
                    &mut ws,
                ).await {
                    let _ = send_error(&mut ws, err).await;
                }
            }
            Some(event) = upstream_event_rx.recv() => {
                if matches!(event, UpstreamEvent::AccountAuthorized(_)) {
                    state = DownstreamState::UpstreamAuthed;
                    if let (Some(user), UpstreamEvent::AccountAuthorized(snapshot)) = (&user_id, &event) {
                        deps.credential_cache.save_account_info(user, snapshot).await;
                    }
                }
                if matches!(event, UpstreamEvent::Disconnected { .. }) {
                    state = DownstreamState::Authed;
                }
                let _ = send_event(&mut ws, &event).await;
            }
            _ = ping_ticker.tick() => {
                let _ = ws.send(WsMessage::Ping(Vec::new())).await;
            }
            _ = liveness_check.tick() => {
                if last_pong_at.elapsed() > pong_deadline {
                    warn!("Downstream transport ping timeout, closing session {}", session_id);
                    break;
                }
            }
            _ = &mut shutdown_rx => {
                info!("Closing downstream session {} for gateway shutdown", session_id);
                let _ = ws.send(WsMessage::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "gateway shutting down".into(),
                }))).await;
                break;
            }
        }
    }

    if let Some(session) = upstream {
        session.disconnect();
        deps.metrics.upstream_disconnected();
    }
    let was_authenticated = user_id.is_some();
    if let Some(user) = &user_id {
        deps.connection_registry.release(user);
        deps.credential_cache.set_connection_status(user, false).await;
    }
    info!("Downstream session {} for user {:?} closed", session_id, user_id);
    was_authenticated
}

#[allow(clippy::too_many_arguments)]
async fn dispatch<S>(
    command: Command,
    message: ClientMessage,
    state: &mut DownstreamState,
    user_id: &mut Option<String>,
    upstream: &mut Option<UpstreamSession>,
    bound_account_id: &mut Option<i64>,
    deps: &DownstreamDeps,
    upstream_event_tx: mpsc::UnboundedSender<UpstreamEvent>,
    ws: &mut S,
) -> Result<(), ClientFacingError>
where
    S: Sink<WsMessage> + Unpin,
{
    match command {
        Command::Authenticate => {
            let payload: crate::modules::downstream::protocol::AuthenticatePayload =
                serde_json::from_value(message.payload)
                    .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            if !deps.credential_cache.validate(&payload.user_id).await {
                return Err(ClientFacingError::AuthFailed(format!(
                    "no valid credentials for user {}",
                    payload.user_id
                )));
            }
            if user_id.is_none() {
                if !deps.connection_registry.try_acquire(&payload.user_id) {
                    return Err(ClientFacingError::ConnectionLimitExceeded);
                }
                deps.metrics.session_authenticated();
            }
            *user_id = Some(payload.user_id.clone());
            *state = DownstreamState::Authed;
            send_kind(ws, "authenticated", json!({})).await;
            Ok(())
        }
        Command::Connect => {
            if *state != DownstreamState::Authed {
                return Err(ClientFacingError::PreconditionFailed(
                    "authenticate before connect, and disconnect before reconnecting".into(),
                ));
            }
            if let Some(stale) = upstream.take() {
                // A prior upstream session is still mid-reconnect internally
                // even though our state machine fell back to Authed; tear it
                // down before replacing it so its supervisor task doesn't leak.
                stale.disconnect();
                deps.metrics.upstream_disconnected();
            }
            let payload: ConnectPayload = serde_json::from_value(message.payload)
                .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            let user = user_id.clone().expect("Authed state implies user_id is set");

            let credentials = deps
                .credential_cache
                .get(&user)
                .await
                .map_err(|e| ClientFacingError::AuthFailed(e.to_string()))?;
            let account_id = payload
                .ctid_trader_account_id
                .unwrap_or(credentials.ctid_trader_account_id);

            let session = UpstreamSession::connect(
                deps.upstream_config.clone(),
                UpstreamCredentials {
                    client_id: deps.broker_client_id.clone(),
                    client_secret: deps.broker_client_secret.clone(),
                    access_token: credentials.access_token.expose().to_string(),
                },
                account_id,
                upstream_event_tx,
            );
            *upstream = Some(session);
            *bound_account_id = Some(account_id);
            *state = DownstreamState::UpstreamBound;
            deps.metrics.upstream_connected();
            deps.credential_cache.set_connection_status(&user, true).await;
            Ok(())
        }
        Command::Disconnect => {
            if let Some(session) = upstream.take() {
                session.disconnect();
                deps.metrics.upstream_disconnected();
                if let Some(user) = user_id.as_ref() {
                    deps.credential_cache.set_connection_status(user, false).await;
                }
            }
            *bound_account_id = None;
            *state = DownstreamState::Authed;
            send_kind(ws, "disconnected", json!({ "reason": "client requested" })).await;
            Ok(())
        }
        Command::Subscribe => {
            require_upstream(state, upstream)?;
            let payload: SubscribePayload = serde_json::from_value(message.payload)
                .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            info!("Subscribe requested for symbol {} (reserved, not forwarded)", payload.symbol_id);
            Ok(())
        }
        Command::Unsubscribe => {
            require_upstream(state, upstream)?;
            let payload: SubscribePayload = serde_json::from_value(message.payload)
                .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            info!("Unsubscribe requested for symbol {} (reserved, not forwarded)", payload.symbol_id);
            Ok(())
        }
        Command::Order => {
            let account_id = bound_account_id.ok_or_else(|| {
                ClientFacingError::PreconditionFailed("connect before trading".into())
            })?;
            let session = require_upstream(state, upstream)?;
            let payload: OrderPayload = serde_json::from_value(message.payload)
                .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            let trade_side = if payload.side.eq_ignore_ascii_case("buy") { 1 } else { 2 };
            session.send_order(NewOrderReq {
                ctid_trader_account_id: account_id,
                symbol_id: payload.symbol_id,
                order_type: 1,
                trade_side,
                volume: (payload.volume * crate::domain::UNIT_SCALE) as i64,
                stop_loss: payload.stop_loss,
                take_profit: payload.take_profit,
                comment: None,
            });
            Ok(())
        }
        Command::ClosePosition => {
            let account_id = bound_account_id.ok_or_else(|| {
                ClientFacingError::PreconditionFailed("connect before trading".into())
            })?;
            let session = require_upstream(state, upstream)?;
            let payload: ClosePositionPayload = serde_json::from_value(message.payload)
                .map_err(|e| ClientFacingError::BadCommand(e.to_string()))?;
            let position_id: i64 = payload
                .position_id
                .parse()
                .map_err(|_| ClientFacingError::BadCommand("invalid position_id".into()))?;
            session.close_position(ClosePositionReq {
                ctid_trader_account_id: account_id,
                position_id,
                volume: (payload.volume * crate::domain::UNIT_SCALE) as i64,
            });
            Ok(())
        }
        Command::Ping => {
            send_kind(ws, "pong", json!({})).await;
            Ok(())
        }
    }
}

/// `order`/`closePosition`/`subscribe`/`unsubscribe` all require the upstream
/// session to have reached AccountAuthed; `UpstreamBound` (handshake still in
/// flight) is not enough.
fn require_upstream<'a>(
    state: &DownstreamState,
    upstream: &'a mut Option<UpstreamSession>,
) -> Result<&'a UpstreamSession, ClientFacingError> {
    if *state != DownstreamState::UpstreamAuthed {
        return Err(ClientFacingError::PreconditionFailed(
            "upstream not yet AccountAuthed".into(),
        ));
    }
    upstream
        .as_ref()
        .ok_or_else(|| ClientFacingError::PreconditionFailed("no upstream session bound".into()))
}

async fn send_kind<S>(ws: &mut S, kind: &str, payload: serde_json::Value)
where
    S: Sink<WsMessage> + Unpin,
{
    let msg = ServerMessage::new(kind, payload);
    let _ = ws
        .send(WsMessage::Text(serde_json::to_string(&msg).unwrap_or_default()))
        .await;
}

async fn send_error<S>(ws: &mut S, err: ClientFacingError)
where
    S: Sink<WsMessage> + Unpin,
{
    warn!("Client-facing error: {}", err);
    let msg = ServerMessage::new("error", json!({ "message": err.to_string() }));
    let _ = ws
        .send(WsMessage::Text(serde_json::to_string(&msg).unwrap_or_default()))
        .await;
}

async fn send_event<S>(ws: &mut S, event: &UpstreamEvent)
where
    S: Sink<WsMessage> + Unpin,
{
    // Connected/ApplicationAuthenticated are internal handshake progress, not
    // part of the client-facing frame set; they're logged, not forwarded.
    let (kind, payload) = match event {
        UpstreamEvent::Connected | UpstreamEvent::ApplicationAuthenticated => return,
        UpstreamEvent::AccountAuthorized(snapshot) => {
            ("accountUpdate", serde_json::to_value(snapshot).unwrap_or_default())
        }
        UpstreamEvent::PositionsUpdated(positions) => {
            ("positionUpdate", serde_json::to_value(positions).unwrap_or_default())
        }
        UpstreamEvent::ExecutionEvent(data) => (
            "executionEvent",
            json!({
                "orderId": data.order_id.to_string(),
                "positionId": data.position_id.to_string(),
                "executionType": data.execution_type,
            }),
        ),
        UpstreamEvent::SpotEvent(data) => (
            "spotEvent",
            json!({
                "symbolId": data.symbol_id.to_string(),
                "bid": data.bid,
                "ask": data.ask,
            }),
        ),
        UpstreamEvent::Error(err) => ("error", json!({ "message": err.to_string() })),
        UpstreamEvent::Disconnected { code, reason } => {
            ("disconnected", json!({ "code": code, "reason": reason }))
        }
    };

    send_kind(ws, kind, payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_upstream_rejects_when_not_connected() {
        let mut upstream = None;
        let err = require_upstream(&DownstreamState::Authed, &mut upstream).unwrap_err();
        matches!(err, ClientFacingError::PreconditionFailed(_));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }
}
