//! Push channel handler
//!
//! On connect the channel is registered (replacing any prior channel for the
//! session) and, when the session resolves to a stored file, a file watch is
//! started. Inbound `{"type":"ping"}` messages are answered with a pong;
//! observed file changes go out as `{"type":"file_changed", ...}`. On
//! disconnect the watch stops and the registry entry is removed, unless a
//! newer connection already replaced it.

use crate::state::AppState;
use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use sheetserve_core::types::PushEvent;
use sheetserve_watch::{SessionWatch, WatchConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Upgrade to a WebSocket push channel for one session
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_session_socket(socket, session_id, state))
}

async fn handle_session_socket(socket: WebSocket, session_id: String, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.registry.register(&session_id, tx.clone());
    info!(session = %session_id, "Push channel connected");

    // Start watching the stored file, if the session resolves
    let mut watch = None;
    let mut forward_task = None;
    if let Some(stored_path) = state.sessions.resolve(&session_id) {
        let mut session_watch = SessionWatch::new(stored_path, WatchConfig::default());
        match session_watch.start() {
            Ok(mut changes) => {
                let registry = state.registry.clone();
                let watched_session = session_id.clone();
                forward_task = Some(tokio::spawn(async move {
                    while let Some(change) = changes.recv().await {
                        // Self-induced persists are reported too; the watcher
                        // cannot tell them apart from external writes
                        let event = PushEvent::FileChanged {
                            path: change.path.display().to_string(),
                            change_type: change.kind,
                        };
                        registry.send(&watched_session, event);
                    }
                }));
                watch = Some(session_watch);
            }
            Err(err) => {
                error!(session = %session_id, error = %err, "Failed to start file watch");
            }
        }
    }

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(event) => {
                        let Ok(text) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Sender dropped: a newer connection replaced this one
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, &session_id, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(session = %session_id, error = %err, "Push channel error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(mut session_watch) = watch {
        session_watch.stop();
    }
    if let Some(task) = forward_task {
        task.abort();
    }
    state.registry.unregister_channel(&session_id, &tx);
    info!(session = %session_id, "Push channel disconnected");
}

/// Handle an inbound client message
fn handle_client_message(state: &AppState, session_id: &str, text: &str) {
    let Ok(message) = serde_json::from_str::<serde_json::Value>(text) else {
        warn!(session = %session_id, "Ignoring malformed push-channel message");
        return;
    };

    if message.get("type").and_then(|t| t.as_str()) == Some("ping") {
        state.registry.send(session_id, PushEvent::Pong);
    }
}
