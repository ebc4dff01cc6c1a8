//! Per-connection WebSocket handling: the translation layer between raw
//! frames and router requests.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use roomrelay_core::{decode_sent_message, encode_received_message, encode_room_event, new_peer_id, PeerSocketMessage, RawContent, RoomId};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::router::RouterHandle;

/// Keepalive interval for the per-client write half. When using split
/// WebSocket streams, Pong responses to incoming Pings are queued by the
/// read half but only flushed when the write half actually sends data.
/// Without periodic writes, a reverse proxy may consider the relay-side
/// connection idle/dead and close it.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Drives one live WebSocket connection for its entire lifetime: joins the
/// room, forwards decoded frames to the router, forwards router events back
/// out as frames, and leaves the room on disconnect.
pub async fn handle_socket(router: RouterHandle, room_id: RoomId, max_message_bytes: usize, socket: WebSocket) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel::<PeerSocketMessage>();

    let peer_id = new_peer_id();
    router.add_peer(room_id.clone(), peer_id.clone(), sink_tx);
    info!("peer {} joined room {}", peer_id, room_id);

    let send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(KEEPALIVE_INTERVAL);
        ping_interval.tick().await; // skip the first immediate tick

        loop {
            tokio::select! {
                event = sink_rx.recv() => {
                    match event {
                        Some(event) => {
                            let Some(message) = encode_peer_socket_message(event) else {
                                continue;
                            };
                            if ws_sender.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    while let Some(next_message) = ws_receiver.next().await {
        let message = match next_message {
            Ok(message) => message,
            Err(err) => {
                warn!("websocket receive error for {}: {}", peer_id, err);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if text.len() > max_message_bytes {
                    warn!("dropping oversized text frame from {}", peer_id);
                    continue;
                }
                decode_and_relay(&router, &room_id, &peer_id, text.as_bytes(), false);
            }
            Message::Binary(data) => {
                if data.len() > max_message_bytes {
                    warn!("dropping oversized binary frame from {}", peer_id);
                    continue;
                }
                decode_and_relay(&router, &room_id, &peer_id, &data, true);
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    router.remove_peer(room_id.clone(), peer_id.clone());
    send_task.abort();
    info!("peer {} left room {}", peer_id, room_id);
}

fn decode_and_relay(router: &RouterHandle, room_id: &RoomId, peer_id: &str, bytes: &[u8], is_binary: bool) {
    match decode_sent_message(bytes, is_binary) {
        Ok(sent) => router.relay_peer_message(room_id.clone(), peer_id.to_owned(), sent.destination, sent.content),
        Err(err) => warn!("failed to decode frame from {}: {}", peer_id, err),
    }
}

/// Encodes a router-delivered event into the WebSocket frame that carries it:
/// `FromPeer` with binary content writes binary, `FromPeer` with text content
/// writes text, and `FromRelay` always writes text. Returns `None` if
/// encoding fails (only possible for a malformed `from` id, which the router
/// never produces).
fn encode_peer_socket_message(event: PeerSocketMessage) -> Option<Message> {
    match event {
        PeerSocketMessage::FromPeer(received) => {
            let is_binary = matches!(received.content, RawContent::Binary(_));
            match encode_received_message(&received) {
                Ok(bytes) if is_binary => Some(Message::Binary(bytes.into())),
                Ok(bytes) => Some(Message::Text(String::from_utf8_lossy(&bytes).into_owned().into())),
                Err(err) => {
                    warn!("failed to encode message from {}: {}", received.from, err);
                    None
                }
            }
        }
        PeerSocketMessage::FromRelay(event) => {
            let bytes = encode_room_event(&event);
            Some(Message::Text(String::from_utf8_lossy(&bytes).into_owned().into()))
        }
    }
}
