use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{FromRequest, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use broadside_core::net::messages::{
    ChallengeMsg, ChallengeRequestMsg, ChallengeResponseForwardMsg, ChallengeResponseMsg,
    ErrorMsg, JoinAckMsg, JoinMsg, MatchStartMsg, MessageType, PlaceShipsMsg, ServerMessage,
    ShipsOkMsg, ShotFiredMsg, WelcomeMsg,
};
use broadside_core::net::protocol::{decode_message_type, decode_payload};
use broadside_core::player::resolve_display_name;

use crate::config::ConnectionConfig;
use crate::player_registry::PlayerHandle;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let max_size = state.config.limits.max_message_size;
    Ok(ws
        .max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let player_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let shutdown = CancellationToken::new();
    let player = PlayerHandle::new(player_id.clone(), tx, shutdown.clone());

    let writer = spawn_writer(
        ws_sender,
        rx,
        shutdown.clone(),
        state.config.connection.clone(),
    );

    state.players.register(player.clone()).await;
    tracing::info!(player_id = %player_id, "Player connected");

    let welcome = ServerMessage::Welcome(WelcomeMsg {
        id: player_id.clone(),
    });
    if player.send(&welcome).await {
        read_loop(&mut ws_receiver, &state, &player, &shutdown).await;
    }

    // Disconnected: removal closes the queue, which stops the writer.
    state.players.unregister(&player_id).await;
    player.close();
    if state.config.matches.forfeit_on_disconnect {
        state.engine.player_left(&player_id).await;
    }
    if let Err(e) = writer.await {
        tracing::warn!(player_id = %player_id, error = %e, "Writer task failed");
    }

    tracing::info!(player_id = %player_id, "Player disconnected");
}

/// Sole writer to the socket. Exits when the connection is cancelled (after
/// flushing whatever is already queued) or when any write fails or times out.
fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    shutdown: CancellationToken,
    conn: ConnectionConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let write_wait = conn.write_wait();
        let period = conn.ping_period();
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            let msg = tokio::select! {
                () = shutdown.cancelled() => break,
                next = rx.recv() => match next {
                    Some(text) => Message::Text(text),
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };
            if !write_frame(&mut ws_sender, msg, write_wait).await {
                shutdown.cancel();
                return;
            }
        }

        rx.close();
        while let Ok(text) = rx.try_recv() {
            if !write_frame(&mut ws_sender, Message::Text(text), write_wait).await {
                return;
            }
        }
        write_frame(&mut ws_sender, Message::Close(None), write_wait).await;
    })
}

async fn write_frame(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    msg: Message,
    write_wait: Duration,
) -> bool {
    match tokio::time::timeout(write_wait, ws_sender.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            false
        },
        Err(_) => {
            tracing::debug!("WebSocket write timed out");
            false
        },
    }
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    player: &PlayerHandle,
    shutdown: &CancellationToken,
) {
    let pong_wait = state.config.connection.pong_wait();
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            frame = tokio::time::timeout_at(deadline, ws_receiver.next()) => frame,
        };
        let msg = match frame {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                tracing::debug!(player_id = %player.id, error = %e, "WebSocket read failed");
                break;
            },
            Ok(None) => break,
            Err(_) => {
                tracing::info!(player_id = %player.id, "Read deadline elapsed");
                break;
            },
        };

        match msg {
            Message::Text(text) => dispatch(state, player, text.as_str()).await,
            Message::Pong(_) => deadline = Instant::now() + pong_wait,
            Message::Close(_) => break,
            _ => {},
        }
    }
}

async fn dispatch(state: &AppState, player: &PlayerHandle, text: &str) {
    let msg_type = match decode_message_type(text) {
        Ok(Some(t)) => t,
        Ok(None) => return,
        Err(e) => {
            tracing::debug!(player_id = %player.id, error = %e, "Malformed envelope");
            reply_error(player, "bad_message").await;
            return;
        },
    };

    match msg_type {
        MessageType::Join => handle_join(state, player, text).await,
        MessageType::Challenge => handle_challenge(state, player, text).await,
        MessageType::ChallengeResponse => handle_challenge_response(state, player, text).await,
        MessageType::PlaceShips => handle_place_ships(state, player, text).await,
        MessageType::ShotFired => handle_shot_fired(state, player, text).await,
    }
}

async fn reply_error(player: &PlayerHandle, error: &str) {
    player.send(&ServerMessage::Error(ErrorMsg::new(error))).await;
}

async fn handle_join(state: &AppState, player: &PlayerHandle, text: &str) {
    let Ok(join) = decode_payload::<JoinMsg>(text) else {
        reply_error(player, "bad_message").await;
        return;
    };
    let name = resolve_display_name(&player.id, &join.name);
    if state.players.set_name(&player.id, name.clone()).await.is_none() {
        return;
    }
    tracing::info!(player_id = %player.id, name = %name, "Player joined");
    let ack = ServerMessage::JoinAck(JoinAckMsg {
        id: player.id.clone(),
        name,
    });
    player.send(&ack).await;
}

/// Current registry entry for the connection, which carries the latest name.
async fn current(state: &AppState, player: &PlayerHandle) -> PlayerHandle {
    state
        .players
        .lookup(&player.id)
        .await
        .unwrap_or_else(|| player.clone())
}

async fn handle_challenge(state: &AppState, player: &PlayerHandle, text: &str) {
    let Ok(challenge) = decode_payload::<ChallengeMsg>(text) else {
        return;
    };
    if challenge.target_id.is_empty() {
        return;
    }
    if challenge.target_id == player.id {
        reply_error(player, "cannot_challenge_self").await;
        return;
    }

    let Some(target) = state.players.lookup(&challenge.target_id).await else {
        tracing::debug!(player_id = %player.id, target_id = %challenge.target_id, "Challenge target not found");
        reply_error(player, "target_not_found").await;
        return;
    };

    let me = current(state, player).await;
    let request = ServerMessage::ChallengeRequest(ChallengeRequestMsg {
        from_id: me.id.clone(),
        from_name: me.name.clone(),
    });
    tracing::info!(player_id = %me.id, target_id = %target.id, "Challenge sent");
    target.send(&request).await;
}

async fn handle_challenge_response(state: &AppState, player: &PlayerHandle, text: &str) {
    let Ok(response) = decode_payload::<ChallengeResponseMsg>(text) else {
        return;
    };
    if response.target_id.is_empty() {
        return;
    }
    if response.target_id == player.id {
        reply_error(player, "cannot_challenge_self").await;
        return;
    }

    let Some(challenger) = state.players.lookup(&response.target_id).await else {
        reply_error(player, "challenger_not_connected").await;
        return;
    };

    let me = current(state, player).await;
    let forward = ServerMessage::ChallengeResponseForward(ChallengeResponseForwardMsg {
        from_id: me.id.clone(),
        from_name: me.name.clone(),
        accept: response.accept,
        target_id: response.target_id.clone(),
    });
    challenger.send(&forward).await;

    if !response.accept {
        tracing::info!(player_id = %me.id, challenger_id = %challenger.id, "Challenge declined");
        return;
    }

    let (record, sides) = state.engine.open_match(&challenger.id, &me.id).await;
    for (recipient, opponent) in [(&challenger, &me), (&me, &challenger)] {
        let Some(your_side) = sides.side_of(&recipient.id) else {
            continue;
        };
        let start = ServerMessage::MatchStart(MatchStartMsg {
            match_id: record.id.clone(),
            your_side,
            opponent_id: opponent.id.clone(),
            opponent_name: opponent.name.clone(),
        });
        recipient.send(&start).await;
    }
}

async fn handle_place_ships(state: &AppState, player: &PlayerHandle, text: &str) {
    let Ok(payload) = decode_payload::<PlaceShipsMsg>(text) else {
        reply_error(player, "bad_place_ships").await;
        return;
    };

    let reply = match state
        .engine
        .submit_ships(&payload.match_id, &player.id, &payload.ships)
        .await
    {
        Ok(_) => ServerMessage::ShipsOk(ShipsOkMsg {
            match_id: payload.match_id,
        }),
        Err(e) => {
            tracing::debug!(
                player_id = %player.id,
                match_id = %payload.match_id,
                error = %e,
                "Fleet rejected"
            );
            ServerMessage::ShipsError(ErrorMsg::new(e.to_string()))
        },
    };
    player.send(&reply).await;
}

async fn handle_shot_fired(state: &AppState, player: &PlayerHandle, text: &str) {
    let Ok(shot) = decode_payload::<ShotFiredMsg>(text) else {
        reply_error(player, "bad_shot_payload").await;
        return;
    };

    if let Err(e) = state
        .engine
        .process_shot(&shot.match_id, &player.id, shot.x, shot.y)
        .await
    {
        tracing::debug!(
            player_id = %player.id,
            match_id = %shot.match_id,
            error = %e,
            "Shot rejected"
        );
        player
            .send(&ServerMessage::ShotError(ErrorMsg::new(e.to_string())))
            .await;
    }
}
