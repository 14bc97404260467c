//! Upgrades `GET /ws/:session_id` and wires the socket into a per-connection
//! [`Session`](crate::session::Session): a `TransportSink` over the real
//! socket, and an inbound loop dispatching the client event vocabulary (§6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parlance_core::{Error, Result, TransportSink};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::session::Session;
use crate::state::AppState;
use crate::ServerError;

/// Inbound client events (§6). Unknown `type` values and malformed JSON are
/// logged and dropped rather than closing the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientEvent {
    UserMessage { data: UserMessageData },
    Interrupt {},
    Ping {},
    StartListening {},
    StopListening {},
    ModelSettings { data: serde_json::Value },
}

#[derive(Debug, Deserialize)]
struct UserMessageData {
    text: String,
}

/// A `TransportSink` over a real axum WebSocket sender. Wrapped in a mutex
/// because the pipeline's worker tasks (Turn Orchestrator, Audio Streamer)
/// each hold a clone and send concurrently (§9 "Source-pattern
/// substitutions").
struct WebSocketTransport {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl TransportSink for WebSocketTransport {
    async fn send_json(&self, value: serde_json::Value) -> Result<()> {
        let text = serde_json::to_string(&value).map_err(|e| Error::Transport(e.to_string()))?;
        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.sender
            .lock()
            .await
            .send(Message::Binary(data))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.claim_session(session_id) {
        let err = ServerError::SessionNotFound(session_id.to_string());
        let status: StatusCode = err.into();
        return (status, "unknown or already-connected session id").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut receiver) = socket.split();
    let transport = Arc::new(WebSocketTransport { sender: Mutex::new(sink) });

    let session = Session::spawn(
        state.settings.pipeline.queue_capacity,
        Duration::from_millis(state.settings.pipeline.graceful_shutdown_ms),
        Arc::clone(&state.catalog),
        Arc::clone(&state.llm),
        Arc::clone(&state.tts),
        transport.clone(),
    );

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(m) => m,
            Err(err) => {
                let err = ServerError::WebSocket(err.to_string());
                tracing::info!(error = %err, "websocket receive error, tearing down session");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if !dispatch(&text, &session, &transport).await {
                    break;
                }
            }
            Message::Binary(_) => {
                // Inbound audio frames belong to the STT collaborator, which
                // is out of scope (§1 out-of-scope list); dropped here.
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    session.shutdown().await;
}

/// Returns `false` if the transport has failed and the connection should be
/// torn down.
async fn dispatch(text: &str, session: &Session, transport: &Arc<WebSocketTransport>) -> bool {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed client event");
            return true;
        }
    };

    match event {
        ClientEvent::UserMessage { data } => {
            let text = data.text.trim();
            if !text.is_empty() {
                session.submit_user_message(text.to_string()).await;
            }
        }
        ClientEvent::Interrupt {} => {
            session.interrupt().await;
        }
        ClientEvent::Ping {} => {
            if transport.send_json(serde_json::json!({"type": "pong", "data": {}})).await.is_err()
            {
                return false;
            }
        }
        ClientEvent::StartListening {} | ClientEvent::StopListening {} => {
            // Audio capture lifecycle belongs to the STT collaborator
            // (§1 out-of-scope list); acknowledged implicitly by accepting
            // the event rather than dropping the connection.
        }
        ClientEvent::ModelSettings { data } => {
            session.set_model_settings(data);
        }
    }
    true
}
