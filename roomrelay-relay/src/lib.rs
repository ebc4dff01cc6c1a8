//! Application wiring: the axum router, app state, and process entry points.
//! The actual presence/relay logic lives in `router`; connection framing
//! lives in `handler`.

mod error;
mod handler;
mod router;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tracing::info;

use handler::handle_socket;
use router::spawn_router;

pub use error::RelayError;
pub use router::RouterHandle;

/// Default ceiling on a single text or binary frame's byte length. Frames
/// above this are dropped and logged rather than forwarded.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    router: RouterHandle,
    max_message_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            router: spawn_router(),
            max_message_bytes,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_BYTES)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/rooms/{room_id}", get(ws_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), RelayError> {
    info!(
        "relay listening on {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_owned())
    );
    axum::serve(listener, build_router(state))
        .await
        .map_err(|err| RelayError::Serve(err.to_string()))
}

async fn healthz_handler() -> impl IntoResponse {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, Path(room_id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    // Deliberately not bound to `max_message_bytes`: that's the app-level
    // drop-and-warn threshold enforced in `handler`, which needs the full
    // oversized frame to reach it so the connection can stay open. Binding
    // the transport frame size to the same value would make axum/tungstenite
    // reject the frame at the protocol level instead, killing the socket.
    let max_message_bytes = state.max_message_bytes;
    ws.on_upgrade(move |socket| async move {
        handle_socket(state.router, room_id, max_message_bytes, socket).await;
    })
}
