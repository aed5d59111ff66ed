use crate::domain::{RejectReason, SessionId};
use crate::interface_adapters::net::outbound::{Frame, SessionHub};
use crate::interface_adapters::protocol::{ClientMessage, SelectCharacterPayload, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::GameEvent;

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_NAME_LEN: usize = 24;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let session_id = rand_id();
        let span = info_span!("conn", session_id, character = tracing::field::Empty);
        handle_socket(socket, state, session_id).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, session_id: SessionId) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, session_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
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

// Receivers polled by the client loop; kept apart from the session so the
// loop can borrow both at once.
struct ConnIo {
    world_frames_rx: broadcast::Receiver<Frame>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
}

struct SessionCtx {
    session_id: SessionId,
    input_tx: mpsc::Sender<GameEvent>,
    hub: Arc<SessionHub>,
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_world_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

struct ConnCtx {
    io: ConnIo,
    session: SessionCtx,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    session_id: SessionId,
) -> Result<ConnCtx, NetError> {
    // Subscribe before anything is awaited so no event is missed.
    let world_frames_rx = state.hub.subscribe();
    let world_latest_rx = state.hub.latest_world();
    state.hub.register(session_id);

    // Tell the client who it is; a character is chosen afterwards.
    let identity = ServerMessage::identity(session_id);
    let sent = match send_message(socket, &identity).await {
        Ok(bytes) => bytes,
        Err(err) => {
            state.hub.unregister(session_id);
            return Err(err);
        }
    };

    // Give the client the current world right away instead of waiting a tick.
    let latest = world_latest_rx.borrow().clone();
    let mut msgs_out = 1;
    let mut bytes_out = sent as u64;
    if !latest.is_empty() {
        let len = latest.len();
        if let Err(err) = socket.send(Message::Text(latest)).await {
            state.hub.unregister(session_id);
            return Err(NetError::Ws(err));
        }
        msgs_out += 1;
        bytes_out += len as u64;
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        io: ConnIo {
            world_frames_rx,
            world_latest_rx,
        },
        session: SessionCtx {
            session_id,
            input_tx: state.input_tx.clone(),
            hub: Arc::clone(&state.hub),
            lag_recovery_count: 0,

            msgs_in: 0,
            msgs_out,
            bytes_in: 0,
            bytes_out,

            invalid_json: 0,

            last_input_full_log: now,
            last_world_lag_log: now,
            last_invalid_input_log: now,

            close_frame: None,
        },
    })
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn valid_character_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=MAX_NAME_LEN).contains(&len)
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let ConnCtx { io, session } = ctx;
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, session).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // World output in production order; frames for other sessions are skipped.
            world_msg = io.world_frames_rx.recv() => {
                match world_msg {
                    Ok(frame) if !frame.is_for(session.session_id) => false,
                    Ok(frame) => matches!(
                        forward_bytes(frame.bytes, socket, session).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut session.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync with the latest full snapshot.
                        let latest = io.world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            session.lag_recovery_count += 1;
                            debug!(count = session.lag_recovery_count, "sent lag recovery snapshot");
                            matches!(
                                forward_bytes(latest, socket, session).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = session.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(session).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    session: &mut SessionCtx,
) -> Result<LoopControl, NetError> {
    let session_id = session.session_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                session.msgs_in += 1;
                session.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_client_message(socket, session, message).await,
                    Err(parse_err) => {
                        session.invalid_json += 1;
                        if should_log(&mut session.last_invalid_input_log) {
                            warn!(
                                session_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if session.invalid_json > MAX_INVALID_JSON {
                            session.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                session.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(session_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(session_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn handle_client_message(
    socket: &mut WebSocket,
    session: &mut SessionCtx,
    message: ClientMessage,
) -> Result<LoopControl, NetError> {
    let session_id = session.session_id;
    let event = match message {
        ClientMessage::SelectCharacter(payload) => {
            match select_character(session, payload) {
                Ok(event) => {
                    // Selection must not be dropped; wait for room in the queue.
                    session
                        .input_tx
                        .send(event)
                        .await
                        .map_err(|_| NetError::InputClosed)?;
                    return Ok(LoopControl::Continue);
                }
                Err(reason) => {
                    return reject(socket, session, "selectCharacter", reason).await;
                }
            }
        }
        ClientMessage::MoveRequest(p) => GameEvent::Move {
            session_id,
            target: p.target_position,
        },
        ClientMessage::AttackMonster(p) => GameEvent::Attack {
            session_id,
            monster_id: p.monster_id,
        },
        ClientMessage::StopAttack => GameEvent::StopAttack { session_id },
        ClientMessage::CastSkill(p) => GameEvent::CastSkill {
            session_id,
            skill_id: p.skill_id,
            target_id: p.target_id,
        },
        ClientMessage::UseItem(p) => GameEvent::UseItem {
            session_id,
            item_id: p.item_id,
        },
        ClientMessage::Respawn => GameEvent::Respawn { session_id },
    };

    match session.input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut session.last_input_full_log) {
                warn!(session_id, "input channel full; dropping request");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

// Only the name is checked here; the world reserves it and loads any stored
// character in order with pending saves.
fn select_character(
    session: &SessionCtx,
    payload: SelectCharacterPayload,
) -> Result<GameEvent, RejectReason> {
    let name = payload.name.trim();
    if !valid_character_name(name) {
        return Err(RejectReason::InvalidName);
    }

    Span::current().record("character", name);
    debug!(character = %name, "character selection forwarded");
    Ok(GameEvent::Select {
        session_id: session.session_id,
        name: name.to_string(),
        class: payload.class_name.trim().to_string(),
    })
}

async fn reject(
    socket: &mut WebSocket,
    session: &mut SessionCtx,
    action: &str,
    reason: RejectReason,
) -> Result<LoopControl, NetError> {
    let msg = ServerMessage::rejected(action, reason.code());
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            session.msgs_out += 1;
            session.bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            warn!(error = ?err, "failed to send rejection");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_bytes(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    session: &mut SessionCtx,
) -> LoopControl {
    let len = bytes.len();
    match socket
        .send(Message::Text(bytes))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            session.msgs_out += 1;
            session.bytes_out += len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send server message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(session: &SessionCtx) -> Result<(), NetError> {
    let session_id = session.session_id;
    session.hub.unregister(session_id);

    // The world saves the character on the way out; a session that never
    // selected one is ignored there.
    session
        .input_tx
        .send(GameEvent::Leave { session_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        session_id,
        msgs_in = session.msgs_in,
        msgs_out = session.msgs_out,
        bytes_in = session.bytes_in,
        bytes_out = session.bytes_out,
        invalid_json = session.invalid_json,
        lag_recovery_count = session.lag_recovery_count,
        "connection stats"
    );
    info!(session_id, "client disconnected");
    Ok(())
}
