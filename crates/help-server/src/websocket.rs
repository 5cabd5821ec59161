//! WebSocket observer stream.
//!
//! A new socket must authenticate with its first message inside the
//! configured window. Once authenticated it is registered with the
//! [`ConnectionRegistry`](crate::registry::ConnectionRegistry); a writer task
//! drains the connection's queue into the socket while the reader handles
//! commands. Command replies travel through the same queue, so they always
//! follow the status broadcast their transition produced.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::messages::{AlertCommand, ClientMessage, ReplyStatus, ServerMessage};
use crate::state::AppState;

/// Handle WebSocket upgrade request for /ws.
pub async fn ws_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Handle an active WebSocket connection.
async fn handle_ws_connection(mut socket: WebSocket, state: Arc<AppState>) {
    if !authenticate(&mut socket, &state).await {
        reject(socket).await;
        return;
    }

    // registered before the reply so the client never sees itself uncounted;
    // anything broadcast meanwhile waits in the queue behind the reply
    let (tx, rx) = mpsc::channel(state.config().ws_queue_capacity);
    let replies = tx.downgrade();
    let id = state.registry().register(tx);

    // shutdown closes the machine before clearing the registry, so a
    // registration that raced past close_all is caught here
    if state.machine().is_closed() {
        debug!(connection = %id, "server shutting down, refusing observer");
        state.registry().unregister(id);
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    if send_json(&mut socket, &ServerMessage::authenticated()).await.is_err() {
        state.registry().unregister(id);
        return;
    }

    let (sender, receiver) = socket.split();
    let mut send_task = tokio::spawn(forward_to_socket(sender, rx));
    let mut recv_task = tokio::spawn(handle_incoming_messages(receiver, replies, state.clone()));

    tokio::select! {
        _ = &mut send_task => {
            debug!(connection = %id, "WebSocket send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!(connection = %id, "WebSocket receive task completed");
            send_task.abort();
        }
    }

    state.registry().unregister(id);
}

/// Wait for the first message and check it is a valid authentication.
async fn authenticate(socket: &mut WebSocket, state: &AppState) -> bool {
    let window = state.config().ws_auth_timeout;
    let text = match timeout(window, next_text(socket)).await {
        Ok(Some(text)) => text,
        Ok(None) => return false,
        Err(_) => {
            warn!(timeout = ?window, "WebSocket did not authenticate in time");
            return false;
        }
    };

    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(ClientMessage::Authenticate { app_token }) if state.gateway().authorize(&app_token) => {
            info!("WebSocket authenticated");
            true
        }
        Ok(_) => {
            warn!("unauthorized WebSocket request");
            false
        }
        Err(e) => {
            warn!(error = %e, "invalid WebSocket request");
            false
        }
    }
}

/// Tell the client it is not authorized and close.
async fn reject(mut socket: WebSocket) {
    let _ = socket.send(Message::Text("Unauthorized".into())).await;
    let _ = socket.send(Message::Close(None)).await;
}

/// Next text payload, skipping control frames. `None` once the socket closes.
async fn next_text(socket: &mut WebSocket) -> Option<String> {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Binary(data)) => return Some(String::from_utf8_lossy(&data).into_owned()),
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) | Err(_) => return None,
        }
    }
    None
}

async fn send_json(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize message");
            Ok(())
        }
    }
}

/// Drain the connection queue into the socket.
///
/// Ends with a close frame when the registry drops the connection.
async fn forward_to_socket(
    mut sender: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = queue.recv().await {
        match serde_json::to_string(&message) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize message");
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

/// Handle messages from an authenticated client.
async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    replies: mpsc::WeakSender<ServerMessage>,
    state: Arc<AppState>,
) {
    while let Some(msg_result) = receiver.next().await {
        let text = match msg_result {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket receive error");
                break;
            }
        };

        let Some(reply) = respond(&state, &text) else {
            continue;
        };

        // registry already dropped this connection
        let Some(queue) = replies.upgrade() else {
            break;
        };
        if queue.send(reply).await.is_err() {
            break;
        }
    }
}

/// Apply one client message and build the reply, if any.
fn respond(state: &AppState, text: &str) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "invalid WebSocket request");
            return None;
        }
    };

    let ClientMessage::Command { command } = message else {
        debug!("ignoring repeated authentication");
        return None;
    };

    let reply = match command.as_deref().and_then(AlertCommand::parse) {
        None => ServerMessage::invalid_command(),
        Some(AlertCommand::Alert) => {
            info!("alert requested over websocket");
            if state.machine().trigger().is_applied() {
                ServerMessage::result(ReplyStatus::Success, "Alert has been triggered.")
            } else {
                ServerMessage::result(ReplyStatus::Ignored, "Alert was already triggered.")
            }
        }
        Some(AlertCommand::Acknowledge) => {
            info!("acknowledgement requested over websocket");
            if state.machine().acknowledge().is_applied() {
                ServerMessage::result(ReplyStatus::Success, "Alert has been acknowledged.")
            } else {
                ServerMessage::result(
                    ReplyStatus::Ignored,
                    "No alerts ready for acknowledgement.",
                )
            }
        }
    };

    Some(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use help_alert::AlertStatus;

    fn make_test_state(dir: &std::path::Path) -> AppState {
        AppState::new(ServerConfig::default().with_data_dir(dir)).unwrap()
    }

    #[tokio::test]
    async fn alert_then_duplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = make_test_state(dir.path());

        let first = respond(&state, r#"{"type":"command","command":"alert"}"#);
        let second = respond(&state, r#"{"type":"command","command":"alert"}"#);

        assert_eq!(
            first,
            Some(ServerMessage::result(
                ReplyStatus::Success,
                "Alert has been triggered."
            ))
        );
        assert_eq!(
            second,
            Some(ServerMessage::result(
                ReplyStatus::Ignored,
                "Alert was already triggered."
            ))
        );
        assert_eq!(state.machine().snapshot().status, AlertStatus::Triggered);
        state.shutdown();
    }

    #[tokio::test]
    async fn acknowledge_when_ready_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = make_test_state(dir.path());

        let reply = respond(&state, r#"{"type":"command","command":"acknowledge"}"#);

        assert_eq!(
            reply,
            Some(ServerMessage::result(
                ReplyStatus::Ignored,
                "No alerts ready for acknowledgement."
            ))
        );
    }

    #[tokio::test]
    async fn missing_or_unknown_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = make_test_state(dir.path());

        assert_eq!(
            respond(&state, r#"{"type":"command"}"#),
            Some(ServerMessage::invalid_command())
        );
        assert_eq!(
            respond(&state, r#"{"type":"command","command":"reset"}"#),
            Some(ServerMessage::invalid_command())
        );
        assert_eq!(state.machine().snapshot().status, AlertStatus::Ready);
    }

    #[tokio::test]
    async fn garbage_after_auth_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = make_test_state(dir.path());

        assert_eq!(respond(&state, "not json"), None);
        assert_eq!(respond(&state, r#"{"type":"authenticate","appToken":"x"}"#), None);
    }
}
