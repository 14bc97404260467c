//! HTTP endpoints: session minting and the health check. The WebSocket
//! upgrade route lives here too since it is just another route on the same
//! router, but its handler is in [`crate::websocket`].

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::websocket::ws_handler;

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: String,
    websocket_url: String,
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.mint_session();
    let websocket_url = format!("{}/{}", state.settings.server.ws_path, session_id);
    Json(CreateSessionResponse { session_id: session_id.to_string(), websocket_url })
}

async fn health_check() -> impl IntoResponse {
    axum::http::StatusCode::OK
}

pub fn create_router(state: AppState) -> Router {
    let ws_path = format!("{}/:session_id", state.settings.server.ws_path);

    Router::new()
        .route("/sessions", post(create_session))
        .route("/health", get(health_check))
        .route(&ws_path, get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
