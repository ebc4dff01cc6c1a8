//! Wire protocol and peer identity for the room relay.
//!
//! This crate is pure: no sockets, no async runtime, no shared state. It
//! defines the data routed between peers (`message`), the headers-then-body
//! framing that carries it over WebSocket text/binary frames (`codec`), and
//! peer id generation (`peer_id`). The room registry and connection handling
//! that depend on an async runtime live in `roomrelay-relay`.

mod codec;
mod error;
mod message;
mod peer_id;

pub use codec::{
    decode_relay_message, decode_sent_message, encode_received_message, encode_room_event, encode_sent_message,
};
pub use error::CodecError;
pub use message::{
    Destination, PeerId, PeerSocketMessage, RawContent, ReceivedPeerMessage, RoomEvent, RoomId, SentPeerMessage,
};
pub use peer_id::new_peer_id;
