use crate::domain::{Clan, Command, Recipients, SessionId, WorldSnapshot};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientMessage, ServerMessage, StatePatchDto, StateSyncDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::next_session_id;
use crate::use_cases::{OutboundFrame, RoomEvent, RoomHandle, RoomRegistry, RoomUpdate};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    FramesClosed,
    JoinRequired,
    JoinTimeout,
    InvalidJoin,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomQuery {
    // The room id the client wants to join.
    #[serde(default)]
    room_id: Option<String>,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_USERNAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

fn encode(msg: &ServerMessage) -> Result<Utf8Bytes, serde_json::Error> {
    serde_json::to_string(msg).map(Utf8Bytes::from)
}

fn frame_for(update: &RoomUpdate) -> (Recipients, ServerMessage, Option<&'static str>) {
    match update {
        RoomUpdate::Message(out) => {
            let msg = ServerMessage::from(&out.message);
            // Rejected joins and finished games end the connection after delivery.
            let close_reason = match msg {
                ServerMessage::JoinRejected { .. } => Some("join rejected"),
                ServerMessage::GameOver { .. } => Some("game over"),
                _ => None,
            };
            (out.recipients.clone(), msg, close_reason)
        }
        RoomUpdate::Patch(patch) => (
            Recipients::All,
            ServerMessage::StatePatch(StatePatchDto::from(patch.as_ref())),
            None,
        ),
        RoomUpdate::Sync {
            session_id,
            snapshot,
        } => (
            Recipients::Only(session_id.clone()),
            ServerMessage::StateSync(StateSyncDto::from(snapshot.as_ref())),
            None,
        ),
    }
}

pub async fn room_update_serializer(
    mut update_rx: broadcast::Receiver<RoomUpdate>,
    frames_tx: broadcast::Sender<OutboundFrame>,
    latest_rx: watch::Receiver<Arc<WorldSnapshot>>,
) {
    // Serialize each room update once and broadcast the shared bytes.
    loop {
        let (recipients, msg, close_reason) = match update_rx.recv().await {
            Ok(update) => frame_for(&update),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Dropped patches break every client's baseline; resync them all.
                warn!(missed = n, "room serializer lagged; broadcasting full state");
                let snapshot = latest_rx.borrow().clone();
                (
                    Recipients::All,
                    ServerMessage::StateSync(StateSyncDto::from(snapshot.as_ref())),
                    None,
                )
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("room updates channel closed; serializer exiting");
                break;
            }
        };

        let text = match encode(&msg) {
            Ok(text) => text,
            Err(e) => {
                error!(error = ?e, "failed to serialize room update");
                continue;
            }
        };
        let _ = frames_tx.send(OutboundFrame {
            recipients,
            text,
            close_reason,
        });
    }
}

pub fn spawn_room_serializer(room: &RoomHandle) {
    // Spawn a task that serializes room updates for this room.
    tokio::spawn(room_update_serializer(
        room.update_tx.subscribe(),
        room.frames_tx.clone(),
        room.latest_tx.subscribe(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    let room_id = query
        .room_id
        .unwrap_or_else(|| state.default_room_id.to_string());

    let room = match state.room_registry.get_room(&room_id).await {
        Some(room) => room,
        None => {
            return ErrorResponse::reply(StatusCode::NOT_FOUND, "room not found");
        }
    };

    let room_registry = state.room_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, room, room_registry))
}

async fn handle_socket(mut socket: WebSocket, room: RoomHandle, room_registry: Arc<RoomRegistry>) {
    let session_id = next_session_id();
    let span = info_span!(
        "conn",
        session_id = %session_id,
        room_id = %room.room_id,
        username = tracing::field::Empty
    );
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &room, session_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            // Handshake failures already sent their close frame.
            warn!(error = ?e, "join handshake failed");
            let _ = socket.close().await;
            return;
        }
    };

    // Register the connection so the room stays alive while sockets are active.
    if room_registry
        .register_connection(&ctx.room_id)
        .await
        .is_none()
    {
        // The room can be removed between lookup and registration.
        warn!("room missing during connection registration");
        let _ = ctx
            .input_tx
            .send(RoomEvent::Leave {
                session_id: ctx.session_id.clone(),
            })
            .await;
        let _ = send_close_with_reason(&mut socket, close_code::POLICY, "room unavailable").await;
        return;
    }

    span.record("username", ctx.username.as_str());
    info!(clan = %ctx.clan, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx, &room_registry).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let text = encode(msg).map_err(NetError::Serialization)?;
    let bytes = text.len();
    socket
        .send(Message::Text(text))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub session_id: SessionId,
    pub username: String,
    pub clan: Clan,
    // Room id this connection is attached to.
    pub room_id: Arc<str>,
    pub input_tx: mpsc::Sender<RoomEvent>,
    pub frames_rx: broadcast::Receiver<OutboundFrame>,
    pub latest_rx: watch::Receiver<Arc<WorldSnapshot>>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_frames_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    username: String,
    clan: Clan,
    bytes_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    room: &RoomHandle,
    session_id: SessionId,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so the gameInit/stateSync pair is never missed.
    let frames_rx = room.frames_tx.subscribe();
    let latest_rx = room.latest_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // The room answers with gameInit + stateSync, or joinRejected when full.
    room.input_tx
        .send(RoomEvent::Join {
            session_id: session_id.clone(),
            username: join.username.clone(),
            clan: join.clan,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        session_id,
        username: join.username,
        clan: join.clan,
        room_id: room.room_id.clone(),
        input_tx: room.input_tx.clone(),
        frames_rx,
        latest_rx,
        lag_recovery_count: 0,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_frames_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn reject_join(socket: &mut WebSocket, reason: String) -> NetError {
    let _ = send_message(socket, &ServerMessage::JoinRejected { reason }).await;
    let _ = send_close_with_reason(socket, close_code::POLICY, "invalid join").await;
    NetError::InvalidJoin
}

/// Trimmed username, or why it cannot be used.
fn validate_username(raw: &str) -> Result<String, String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err("username is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        ));
    }
    Ok(username.to_string())
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let (username, clan) = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { username, clan }) => (username, clan),
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let username = match validate_username(&username) {
                    Ok(username) => username,
                    Err(reason) => return Err(reject_join(socket, reason).await),
                };
                let clan = match Clan::from_str(&clan) {
                    Ok(clan) => clan,
                    Err(reason) => return Err(reject_join(socket, reason).await),
                };

                return Ok(JoinHandshake {
                    username,
                    clan,
                    bytes_in,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Drops commands carrying NaN or infinite coordinates.
fn sanitize_command(command: Command) -> Option<Command> {
    let finite = match &command {
        Command::Move { x, y } => x.is_finite() && y.is_finite(),
        Command::UseAbility {
            target_x, target_y, ..
        } => target_x.is_finite() && target_y.is_finite(),
        Command::ClaimTerritory { x, y, .. } => x.is_finite() && y.is_finite(),
        Command::FormBloodPact { .. } => true,
    };
    finite.then_some(command)
}

fn process_command(
    session_id: &str,
    input_tx: &mpsc::Sender<RoomEvent>,
    command: Command,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(command) = sanitize_command(command) else {
        if should_log(last_invalid_input_log) {
            warn!("invalid command values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match input_tx.try_send(RoomEvent::Command {
        session_id: session_id.to_string(),
        command,
    }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!("input channel full; dropping command");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    room_registry: &RoomRegistry,
) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        session_id,
        room_id,
        input_tx,
        frames_rx,
        latest_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_frames_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    session_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            frame = frames_rx.recv() => {
                match frame {
                    Ok(frame) if !frame.recipients.includes(session_id) => false,
                    Ok(frame) => {
                        let close_reason = frame.close_reason;
                        match (forward_frame(frame.text, socket, msgs_out, bytes_out).await, close_reason) {
                            (LoopControl::Continue, Some(reason)) => {
                                *close_frame = Some(CloseFrame {
                                    code: close_code::NORMAL,
                                    reason: reason.into(),
                                });
                                info!(reason, "room closed the session");
                                true
                            }
                            (LoopControl::Continue, None) => false,
                            (LoopControl::Disconnect, _) => true,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_frames_lag_log) {
                            warn!(missed = n, "room frames lagged; sending full state");
                        }

                        // Resync strategy: send the latest full snapshot.
                        let snapshot = latest_rx.borrow().clone();
                        let msg = ServerMessage::StateSync(StateSyncDto::from(snapshot.as_ref()));
                        *lag_recovery_count += 1;
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                if should_log(last_frames_lag_log) {
                                    debug!(
                                        bytes,
                                        count = *lag_recovery_count,
                                        "sent lag recovery state"
                                    );
                                }
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send lag recovery state");
                                true
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The room was disposed.
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        session_id,
        room_id,
        room_registry,
        input_tx,
        ConnStats {
            msgs_in: *msgs_in,
            msgs_out: *msgs_out,
            bytes_in: *bytes_in,
            bytes_out: *bytes_out,
            invalid_json: *invalid_json,
            lag_recovery_count: *lag_recovery_count,
        },
    )
    .await
    {
        debug!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    session_id: &str,
    input_tx: &mpsc::Sender<RoomEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => match message.into_command() {
                        Some(command) => process_command(
                            session_id,
                            input_tx,
                            command,
                            last_input_full_log,
                            last_invalid_input_log,
                        ),
                        None => {
                            // Ignore repeated join frames to keep the session stable.
                            if should_log(last_invalid_input_log) {
                                warn!("duplicate join ignored");
                            }
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
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
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(
    text: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = text.len();
    match socket.send(Message::Text(text)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send room frame");
            LoopControl::Disconnect
        }
    }
}

#[derive(Debug)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
}

async fn disconnect_cleanup(
    session_id: &SessionId,
    room_id: &Arc<str>,
    room_registry: &RoomRegistry,
    input_tx: &mpsc::Sender<RoomEvent>,
    stats: ConnStats,
) -> Result<(), NetError> {
    // Count the disconnect even if the room task is already gone.
    let leave = input_tx
        .send(RoomEvent::Leave {
            session_id: session_id.clone(),
        })
        .await
        .map_err(|_| NetError::InputClosed);

    room_registry.register_disconnect(room_id).await;

    debug!(?stats, "connection stats");
    info!("client disconnected");
    leave
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameResult, Outbound, RoomMessage, StatePatch};

    #[test]
    fn when_username_is_padded_then_it_is_trimmed() {
        assert_eq!(validate_username("  vlad  "), Ok("vlad".to_string()));
    }

    #[test]
    fn when_username_is_blank_or_too_long_then_it_is_rejected() {
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN)).is_ok());
    }

    #[test]
    fn when_coordinates_are_not_finite_then_command_is_dropped() {
        assert_eq!(
            sanitize_command(Command::Move {
                x: f32::NAN,
                y: 1.0
            }),
            None
        );
        assert!(
            sanitize_command(Command::UseAbility {
                ability_id: "bloodDrain".to_string(),
                target_x: 0.0,
                target_y: f32::INFINITY,
            })
            .is_none()
        );
        assert!(
            sanitize_command(Command::FormBloodPact {
                target_player_id: "s2".to_string()
            })
            .is_some()
        );
    }

    #[test]
    fn when_room_rejects_join_then_frame_closes_only_that_session() {
        let update = RoomUpdate::Message(Outbound::to_session(
            "s2",
            RoomMessage::JoinRejected {
                reason: "room is full".to_string(),
            },
        ));

        let (recipients, msg, close_reason) = frame_for(&update);

        assert_eq!(close_reason, Some("join rejected"));
        assert_eq!(recipients, Recipients::Only("s2".to_string()));
        assert!(matches!(msg, ServerMessage::JoinRejected { .. }));
    }

    #[test]
    fn when_patch_is_framed_then_it_goes_to_everyone() {
        let update = RoomUpdate::Patch(Arc::new(StatePatch::default()));

        let (recipients, msg, close_reason) = frame_for(&update);

        assert_eq!(close_reason, None);
        assert_eq!(recipients, Recipients::All);
        assert!(matches!(msg, ServerMessage::StatePatch(_)));
    }

    #[test]
    fn when_game_ends_then_every_session_is_closed_after_the_frame() {
        let update = RoomUpdate::Message(Outbound::to_all(RoomMessage::GameOver {
            result: GameResult::Defeat,
        }));

        let (recipients, msg, close_reason) = frame_for(&update);

        assert_eq!(close_reason, Some("game over"));
        assert_eq!(recipients, Recipients::All);
        assert!(matches!(msg, ServerMessage::GameOver { .. }));
    }

    #[tokio::test]
    async fn when_update_is_published_then_serializer_emits_shared_frame() {
        let (update_tx, update_rx) = broadcast::channel(8);
        let (frames_tx, mut frames_rx) = broadcast::channel(8);
        let snapshot = Arc::new(WorldSnapshot::empty(crate::domain::diff::WorldMeta {
            map_width: 7000.0,
            map_height: 7000.0,
            day_night_cycle: true,
            current_time: crate::domain::TimeOfDay::Day,
            day_night_duration: 300.0,
        }));
        let (_latest_tx, latest_rx) = watch::channel(snapshot);
        tokio::spawn(room_update_serializer(update_rx, frames_tx, latest_rx));

        update_tx
            .send(RoomUpdate::Message(Outbound::to_all(RoomMessage::PlayerDied {
                player_id: "s1".to_string(),
            })))
            .expect("serializer subscribed");

        let frame = frames_rx.recv().await.expect("frame");
        assert_eq!(frame.recipients, Recipients::All);
        assert_eq!(frame.close_reason, None);
        assert_eq!(
            frame.text.as_str(),
            r#"{"type":"playerDied","data":{"playerId":"s1"}}"#
        );
    }
}
