use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{SessionView, WebinarContext};
use crate::routes::api_routes::error_response;
use crate::service::chat_service::ChatService;
use crate::service::chat_session::SessionHandle;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsClientEvent {
    Submit { message: String },
    SwitchContext { context: WebinarContext },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsServerEvent<'a> {
    Snapshot { view: &'a SessionView },
    Error { message: String },
}

/// GET `/ws/sessions/{id}` — upgrades to a WebSocket that mirrors the session.
pub async fn ws_session_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.session(&id).await {
        Ok(handle) => ws.on_upgrade(move |socket| handle_socket(socket, id, handle)),
        Err(e) => error_response(&e),
    }
}

/// Handles a single WebSocket connection.
///
/// Protocol:
/// - Server sends `{ "type": "snapshot", "view": {...} }` on connect and after
///   every message or loading change.
/// - Client may send `{ "type": "submit", "message": "..." }` or
///   `{ "type": "switch_context", "context": {...} }`; results arrive as
///   snapshots. `{ "type": "error", "message": "..." }` reports bad input.
async fn handle_socket(socket: WebSocket, session_id: String, handle: SessionHandle) {
    info!("WebSocket client attached to session {session_id}");

    let (mut sender, mut receiver) = socket.split();
    let mut observer = handle.subscribe().await;

    if send_event(&mut sender, &WsServerEvent::Snapshot { view: &handle.view().await })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            changed = observer.messages.changed() => {
                if changed.is_err() { break; }
            }
            changed = observer.loading.changed() => {
                if changed.is_err() { break; }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(t))) => t.to_string(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {e}");
                        break;
                    }
                };
                let rejected = match serde_json::from_str::<WsClientEvent>(&text) {
                    Ok(event) => dispatch(&handle, event).await.err(),
                    Err(e) => Some(format!("Invalid request: {e}")),
                };
                if let Some(message) = rejected {
                    if send_event(&mut sender, &WsServerEvent::Error { message }).await.is_err() {
                        break;
                    }
                }
                continue;
            }
        }

        let view = handle.view().await;
        if send_event(&mut sender, &WsServerEvent::Snapshot { view: &view }).await.is_err() {
            break;
        }
    }

    info!("WebSocket client detached from session {session_id}");
}

/// Submits run in their own task so snapshots keep flowing while the model
/// call is outstanding. Invalid events come back as an error message.
async fn dispatch(handle: &SessionHandle, event: WsClientEvent) -> Result<(), String> {
    validate(&event)?;
    match event {
        WsClientEvent::Submit { message } => {
            let handle = handle.clone();
            tokio::spawn(async move {
                if let Err(e) = handle.submit(&message).await {
                    error!("WebSocket submit failed: {e}");
                }
            });
        }
        WsClientEvent::SwitchContext { context } => {
            handle.switch_context(context).await;
        }
    }
    Ok(())
}

fn validate(event: &WsClientEvent) -> Result<(), String> {
    match event {
        WsClientEvent::SwitchContext { context } if context.title.trim().is_empty() => {
            Err(AppError::EmptyField { field_name: "title".to_string() }.to_string())
        }
        _ => Ok(()),
    }
}

/// Helper: serialize a `WsServerEvent` and send it over the socket.
async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &WsServerEvent<'_>,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize WebSocket event: {e}");
            Ok(())
        }
    }
}
