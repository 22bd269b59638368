//! Per-connection handler: greeting, event intake, and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection and send `connected`
//!   2. Loop: wait for the next client frame, the next room broadcast, or
//!      the idle deadline, whichever comes first
//!   3. On exit, the guard unregisters the connection and runs the
//!      disconnect path for its room
//!
//! Rejections never end the loop. They come back to this client as
//! private `join-error`, `room-full`, `move-error` or `error` events.

use std::sync::Arc;

use hangout_protocol::{
    ClientEvent, Codec, ConnectionId, Envelope, GameKind, MoveRequest, RoomCode, ServerEvent,
    now_millis,
};
use hangout_room::{Action, EvictReason, Outbound, PlayerSender, RoomError};
use hangout_transport::{Connection, TransportError, WebSocketConnection};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::HangoutError;
use crate::server::ServerState;

/// Drop guard that cleans up after a connection when the handler exits.
///
/// This ensures cleanup happens even if the handler errors out. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the async
/// locks. Stats go last, after the room has seen the departure.
struct ConnectionGuard {
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let binding = state.registry.lock().await.unregister(conn_id);
            if let Some(binding) = binding {
                if let Err(e) = state.leave(&binding, conn_id).await {
                    tracing::debug!(%conn_id, room_id = %binding.room, error = %e, "leave on disconnect failed");
                }
            }
            if state.stats.remove(conn_id).is_some() {
                tracing::debug!(%conn_id, tracked = state.stats.len(), "stats dropped");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HangoutError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    state.registry.lock().await.register(conn_id)?;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // Rooms push frames here; the handler holds a sender for its own joins,
    // so the receiver never reports closed.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();

    send_event(&conn, &state, ServerEvent::Connected { connection_id: conn_id }).await?;

    let idle = state.config.client_idle_timeout;
    let mut deadline = Instant::now() + idle;

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(TransportError::FrameTooLarge { len, max }) => {
                        tracing::debug!(%conn_id, len, max, "oversized frame dropped");
                        send_error(&conn, &state, format!("message too large: {len} bytes, limit is {max}")).await?;
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                deadline = Instant::now() + idle;
                handle_frame(&conn, &state, &outbound_tx, &data).await?;
            }
            Some(out) = outbound_rx.recv() => {
                forward(&conn, &state, out).await?;
            }
            () = tokio::time::sleep_until(deadline) => {
                tracing::info!(%conn_id, idle_secs = idle.as_secs(), "connection timed out");
                break;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → unregister and leave fire.
    Ok(())
}

/// Decodes one client frame and dispatches it.
async fn handle_frame(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    outbound: &PlayerSender,
    data: &[u8],
) -> Result<(), HangoutError> {
    let conn_id = conn.id();
    let envelope: Envelope<ClientEvent> = match state.codec.decode(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode client event");
            return send_error(conn, state, format!("invalid message: {e}")).await;
        }
    };

    let event = envelope.payload;
    tracing::trace!(%conn_id, event = event.name(), "client event");

    match event {
        ClientEvent::Heartbeat { client_time } => {
            let ack = ServerEvent::HeartbeatAck {
                client_time,
                server_time: now_millis(),
            };
            send_event(conn, state, ack).await?;
        }
        ClientEvent::JoinRoom {
            room_id,
            display_name,
            game,
            options,
        } => {
            join(conn, state, outbound, room_id, display_name, game, options).await?;
        }
        ClientEvent::LeaveRoom => {
            let binding = state.registry.lock().await.unbind(conn_id);
            match binding {
                Some(binding) => {
                    if let Err(e) = state.leave(&binding, conn_id).await {
                        tracing::debug!(%conn_id, room_id = %binding.room, error = %e, "leave failed");
                    }
                    send_event(conn, state, ServerEvent::RoomLeft { room_id: binding.room }).await?;
                }
                None => send_error(conn, state, "you are not in a room".to_string()).await?,
            }
        }
        other => room_command(conn, state, other).await?,
    }
    Ok(())
}

/// Handles `join-room`.
///
/// A connection sits in at most one room, so joining a different room
/// first leaves the current one.
async fn join(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    outbound: &PlayerSender,
    room_id: RoomCode,
    display_name: String,
    game: GameKind,
    options: Option<Value>,
) -> Result<(), HangoutError> {
    let conn_id = conn.id();

    let current = state.registry.lock().await.lookup(conn_id).cloned();
    if let Some(current) = current.filter(|b| !b.is(&room_id, game)) {
        state.registry.lock().await.unbind(conn_id);
        if let Err(e) = state.leave(&current, conn_id).await {
            tracing::debug!(%conn_id, room_id = %current.room, error = %e, "leave before join failed");
        }
    }

    let joined = state
        .join(
            game,
            &room_id,
            conn_id,
            &display_name,
            options.as_ref(),
            outbound.clone(),
        )
        .await;

    match joined {
        Ok(outcome) => {
            state
                .registry
                .lock()
                .await
                .bind(conn_id, room_id.clone(), game, display_name.trim())?;
            tracing::info!(
                %conn_id,
                room_id = %room_id,
                %game,
                reconnected = outcome.reconnected,
                "connection joined room"
            );
        }
        Err(err @ RoomError::RoomFull(_)) => {
            send_event(conn, state, ServerEvent::RoomFull { message: err.to_string() }).await?;
        }
        Err(err) => {
            tracing::debug!(%conn_id, room_id = %room_id, error = %err, "join rejected");
            send_event(conn, state, ServerEvent::JoinError { message: err.to_string() }).await?;
        }
    }
    Ok(())
}

/// Routes a room-scoped command to the room the sender is bound to.
async fn room_command(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    event: ClientEvent,
) -> Result<(), HangoutError> {
    let conn_id = conn.id();
    let name = event.name();
    let Some(requested) = event.room_id().cloned() else {
        return Ok(());
    };
    let Some(action) = into_action(event) else {
        return Ok(());
    };

    let resolved = state.registry.lock().await.resolve(conn_id, &requested).cloned();
    let binding = match resolved {
        Ok(binding) => binding,
        Err(e) => {
            tracing::debug!(%conn_id, event = name, error = %e, "command for a room not joined");
            return send_error(conn, state, format!("you are not in room {requested}")).await;
        }
    };

    match state.act(&binding, conn_id, action).await {
        Ok(()) => {}
        Err(err @ (RoomError::NotFound(_) | RoomError::Unavailable(_))) => {
            state
                .registry
                .lock()
                .await
                .unbind_if(conn_id, &binding.room, binding.game);
            send_error(conn, state, err.to_string()).await?;
        }
        // The room has already told the sender why.
        Err(err) => tracing::debug!(%conn_id, event = name, error = %err, "command rejected"),
    }
    Ok(())
}

/// Maps a room-scoped client event onto the room command it stands for.
fn into_action(event: ClientEvent) -> Option<Action> {
    let action = match event {
        ClientEvent::MakeMove { cell, .. } => Action::Move(MoveRequest::Cell(cell)),
        ClientEvent::DrawLine { line, .. } => Action::Move(MoveRequest::Line(line)),
        ClientEvent::CallNumber { number, .. } => Action::Move(MoveRequest::Number(number)),
        ClientEvent::ToggleAutoCall { .. } => Action::ToggleAutoPlay,
        ClientEvent::SkipTurn { .. } => Action::SkipTurn,
        ClientEvent::RequestHint { .. } => Action::Hint,
        ClientEvent::ResetGame { .. } => Action::Reset,
        ClientEvent::NextGame { .. } => Action::NextGame,
        ClientEvent::StopPlaying { .. } => Action::Stop,
        ClientEvent::RestartGame { .. } => Action::Restart,
        ClientEvent::TerminateRoom { .. } => Action::Terminate,
        ClientEvent::SendMessage { text, .. } => Action::Chat(text),
        ClientEvent::SendReaction { reaction, .. } => Action::React(reaction),
        ClientEvent::GetChatHistory { .. } => Action::ChatHistory,
        ClientEvent::JoinRoom { .. } | ClientEvent::LeaveRoom | ClientEvent::Heartbeat { .. } => {
            return None;
        }
    };
    Some(action)
}

/// Writes room traffic to the socket.
async fn forward(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    out: Outbound,
) -> Result<(), HangoutError> {
    match out {
        Outbound::Frame(frame) => conn.send(&frame).await?,
        Outbound::Evicted { room, game, reason } => {
            let conn_id = conn.id();
            let unbound = state.registry.lock().await.unbind_if(conn_id, &room, game);
            tracing::info!(%conn_id, room_id = %room, ?reason, unbound, "evicted from room");
            if unbound {
                let message = match reason {
                    EvictReason::Replaced => {
                        format!("another connection took over your seat in room {room}")
                    }
                    EvictReason::Closed => format!("room {room} has closed"),
                };
                send_error(conn, state, message).await?;
            }
        }
    }
    Ok(())
}

/// Sends a connection-level event (unsequenced).
async fn send_event(
    conn: &WebSocketConnection,
    state: &ServerState,
    event: ServerEvent,
) -> Result<(), HangoutError> {
    let bytes = state.codec.encode(&Envelope::unsequenced(event))?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error(
    conn: &WebSocketConnection,
    state: &ServerState,
    message: String,
) -> Result<(), HangoutError> {
    send_event(conn, state, ServerEvent::Error { message }).await
}
