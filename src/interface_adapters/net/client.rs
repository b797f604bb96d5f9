use crate::interface_adapters::protocol::{
    decode_client_message, ClientMessage, PlayerDto, ProtocolError, ServerMessage, WELCOME_MESSAGE,
};
use crate::interface_adapters::state::{AppState, OutboundFrame};
use crate::interface_adapters::utils::ids::next_client_id;
use crate::use_cases::game::submit_event;
use crate::use_cases::{GameEvent, RaceBroadcast};

use axum::{
    Error,
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    FramesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
// Error replies allowed per connection within one `LOG_THROTTLE` window.
const ERROR_REPLY_BURST: u32 = 10;

/// Caps how many `error` replies a connection gets per window. Invalid input past the cap is
/// still rejected, just silently.
#[derive(Debug)]
struct ReplyBudget {
    window_start: Instant,
    used: u32,
}

impl ReplyBudget {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            used: 0,
        }
    }

    fn allow(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= LOG_THROTTLE {
            self.window_start = now;
            self.used = 0;
        }
        if self.used < ERROR_REPLY_BURST {
            self.used += 1;
            true
        } else {
            false
        }
    }
}

/// Serializes each race broadcast once and fans the shared bytes out to all connections.
pub async fn broadcast_serializer(
    mut world_rx: broadcast::Receiver<RaceBroadcast>,
    frames_tx: broadcast::Sender<OutboundFrame>,
    latest_state_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match world_rx.recv().await {
            Ok(msg) => {
                let exclude = match &msg {
                    RaceBroadcast::PlayerJoined(car) => Some(car.id),
                    _ => None,
                };
                let txt = match serde_json::to_string(&ServerMessage::from(&msg)) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize race broadcast");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if matches!(msg, RaceBroadcast::State(_)) {
                    // Store the latest snapshot for lag recovery, even with no subscribers yet.
                    latest_state_tx.send_replace(bytes.clone());
                }
                let _ = frames_tx.send(OutboundFrame { exclude, bytes });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "broadcast serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("race broadcast channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let client_id = next_client_id();
        let span = info_span!("conn", client_id);
        handle_socket(socket, state, client_id).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, client_id: u64) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, client_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            // The socket is unusable; nothing was created for this connection yet.
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub client_id: u64,
    // Whether this connection owns a car in the race.
    pub has_car: bool,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub input_delay: Duration,
    pub frames_rx: broadcast::Receiver<OutboundFrame>,
    pub latest_state_rx: watch::Receiver<Utf8Bytes>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_messages: u32,
    pub suppressed_errors: u64,
    error_budget: ReplyBudget,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    client_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe to broadcasts *before* doing anything else (awaits) to not miss packets.
    let frames_rx = state.frames_tx.subscribe();
    let latest_state_rx = state.latest_state_tx.subscribe();

    let mut bytes_out = send_message(
        socket,
        &ServerMessage::Welcome {
            client_id,
            message: WELCOME_MESSAGE.to_string(),
        },
    )
    .await? as u64;
    let mut msgs_out = 1;

    let (reply, existing_rx) = oneshot::channel();
    state
        .input_tx
        .send(GameEvent::ExistingPlayers { reply })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let existing = existing_rx.await.map_err(|_| NetError::InputClosed)?;
    if !existing.is_empty() {
        let msg = ServerMessage::ExistingPlayers {
            players: existing.iter().map(PlayerDto::from).collect(),
        };
        bytes_out += send_message(socket, &msg).await? as u64;
        msgs_out += 1;
    }

    let now = Instant::now()
        .checked_sub(LOG_THROTTLE)
        .unwrap_or_else(Instant::now);
    Ok(ConnCtx {
        client_id,
        has_car: false,
        input_tx: state.input_tx.clone(),
        input_delay: state.input_delay,
        frames_rx,
        latest_state_rx,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out,
        bytes_in: 0,
        bytes_out,

        invalid_messages: 0,
        suppressed_errors: 0,
        error_budget: ReplyBudget::new(Instant::now()),

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let client_id = ctx.client_id;
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing broadcast
            frame = ctx.frames_rx.recv() => {
                match frame {
                    Ok(frame) if frame.exclude == Some(client_id) => false,
                    Ok(frame) => match forward_bytes(frame.bytes, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "broadcasts lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = ctx.latest_state_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.lag_recovery_count += 1;
                            match forward_bytes(latest, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let client_id = ctx.client_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match decode_client_message(&text) {
                    Ok(msg) => handle_client_message(socket, msg, ctx).await,
                    Err(err) => reject_invalid(socket, ctx, text.len(), err).await,
                }
            }
            Message::Binary(data) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += data.len() as u64;
                reject_invalid(socket, ctx, data.len(), ProtocolError::BinaryFrame).await
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(client_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(client_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

/// Answers a frame that could not be decoded. The connection and its car are left untouched.
async fn reject_invalid(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    bytes: usize,
    err: ProtocolError,
) -> Result<LoopControl, NetError> {
    ctx.invalid_messages += 1;
    if should_log(&mut ctx.last_invalid_input_log) {
        warn!(
            client_id = ctx.client_id,
            bytes,
            invalid_messages = ctx.invalid_messages,
            suppressed_errors = ctx.suppressed_errors,
            error = ?err,
            "rejected client message"
        );
    }

    if !ctx.error_budget.allow(Instant::now()) {
        ctx.suppressed_errors += 1;
        return Ok(LoopControl::Continue);
    }

    reply(
        socket,
        ctx,
        &ServerMessage::Error {
            message: err.to_string(),
        },
    )
    .await
}

async fn handle_client_message(
    socket: &mut WebSocket,
    msg: ClientMessage,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let client_id = ctx.client_id;
    match msg {
        ClientMessage::HostAnnounce => {
            info!(client_id, "client announced as host");
            Ok(LoopControl::Continue)
        }
        ClientMessage::PlayerSetup { name, car_id } => {
            let (reply_tx, reply_rx) = oneshot::channel();
            ctx.input_tx
                .send(GameEvent::Setup {
                    client_id,
                    name,
                    car_id,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| NetError::InputClosed)?;

            match reply_rx.await.map_err(|_| NetError::InputClosed)? {
                Ok(_) => {
                    ctx.has_car = true;
                    Ok(LoopControl::Continue)
                }
                Err(e) => {
                    reply(
                        socket,
                        ctx,
                        &ServerMessage::Error {
                            message: e.to_string(),
                        },
                    )
                    .await
                }
            }
        }
        ClientMessage::ControlInput { controls } => {
            if !ctx.has_car {
                if should_log(&mut ctx.last_invalid_input_log) {
                    debug!(client_id, "control input before setup ignored");
                }
                return Ok(LoopControl::Continue);
            }

            let event = GameEvent::Input {
                client_id,
                controls: controls.into(),
            };
            match submit_event(&ctx.input_tx, event, ctx.input_delay) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(mpsc::error::TrySendError::Full(_evt)) => {
                    if should_log(&mut ctx.last_input_full_log) {
                        warn!(client_id, "input channel full; dropping input");
                    }
                    Ok(LoopControl::Continue)
                }
                Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
            }
        }
        ClientMessage::Unknown => {
            if should_log(&mut ctx.last_invalid_input_log) {
                info!(client_id, "unknown message type ignored");
            }
            Ok(LoopControl::Continue)
        }
    }
}

/// Sends a message to this connection only.
async fn reply(socket: &mut WebSocket, ctx: &mut ConnCtx, msg: &ServerMessage) -> Result<LoopControl, NetError> {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            warn!(error = ?err, "failed to send reply");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_bytes(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send broadcast");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    // The race loop ignores leaves for connections that never owned a car.
    ctx.input_tx
        .send(GameEvent::Leave {
            client_id: ctx.client_id,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        client_id = ctx.client_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_messages = ctx.invalid_messages,
        suppressed_errors = ctx.suppressed_errors,
        lag_recovery_count = ctx.lag_recovery_count,
        had_car = ctx.has_car,
        "connection stats"
    );
    info!(client_id = ctx.client_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_replies_are_capped_per_window_then_refill() {
        let start = Instant::now();
        let mut budget = ReplyBudget::new(start);

        for _ in 0..ERROR_REPLY_BURST {
            assert!(budget.allow(start));
        }
        assert!(!budget.allow(start + Duration::from_millis(500)));

        assert!(budget.allow(start + LOG_THROTTLE));
        assert_eq!(budget.used, 1);
    }
}
