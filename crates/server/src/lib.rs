//! HTTP and WebSocket entry point: mints sessions, upgrades the WebSocket,
//! and wires a `TransportSink` over the real socket for the pipeline and
//! orchestrator crates to emit through.

pub mod http;
pub mod reference;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use session::Session;
pub use state::AppState;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("websocket error: {0}")]
    WebSocket(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::WebSocket(_) => axum::http::StatusCode::BAD_REQUEST,
        }
    }
}
