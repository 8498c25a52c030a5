//! WebSocket upgrade handler

use std::fmt::Display;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::player::PlayerId;
use crate::game::MatchCommand;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();
    serve_connection(ws_sink, ws_stream, state).await;
}

/// Drive one connection from `init` to cleanup over any frame sink/stream pair
async fn serve_connection<S, R, E>(mut ws_sink: S, ws_stream: R, state: AppState)
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    // init goes out before the connection can receive any broadcast
    let init = ServerMsg::Init {
        player_id,
        arena: (*state.arena).clone(),
        player_config: (*state.player_config).clone(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &init).await {
        error!(player_id = %player_id, error = %e, "Failed to send init");
        return;
    }

    let outbound_rx = state.hub.register(player_id);

    run_session(player_id, &state, ws_sink, ws_stream, outbound_rx).await;

    // Unregister first so the leaver is not sent its own playerLeft
    state.hub.unregister(player_id);
    if state
        .game
        .submit(MatchCommand::Disconnect { player_id })
        .await
        .is_err()
    {
        debug!(player_id = %player_id, "Match stopped before disconnect");
    }

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session<S, R, E>(
    player_id: PlayerId,
    state: &AppState,
    mut ws_sink: S,
    mut ws_stream: R,
    mut outbound_rx: mpsc::Receiver<String>,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    // Writer task: hub queue -> WebSocket. Ends when the hub drops the sender.
    let mut writer_handle = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> match task
    loop {
        let frame = tokio::select! {
            frame = ws_stream.next() => frame,
            _ = &mut writer_handle => {
                debug!(player_id = %player_id, "Outbound side closed");
                return;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if !rate_limiter.check_message() {
                    warn!(player_id = %player_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if state
                            .game
                            .submit(MatchCommand::Client { player_id, msg })
                            .await
                            .is_err()
                        {
                            debug!(player_id = %player_id, "Match command channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Some(Ok(Message::Binary(_))) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Some(Err(e)) => {
                warn!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
            None => break,
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg<S>(sink: &mut S, msg: &ServerMsg) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
