//! The data model routed between peers: opaque content, routing instructions,
//! and the events the router pushes back out to connection handlers.

/// Opaque room identifier, taken verbatim from the connection URL.
pub type RoomId = String;

/// Base64url encoding of 16 random bytes, assigned by the relay at connect time.
pub type PeerId = String;

/// A payload's content, tagged by the WebSocket frame type that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    Text(String),
    Binary(Vec<u8>),
}

/// Routing instruction attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Every other peer currently in the room.
    Broadcast,
    /// An explicit, non-empty list of recipient peer ids.
    PeerSet(Vec<PeerId>),
}

/// A message as submitted by a client: where it should go, and what it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPeerMessage {
    pub destination: Destination,
    pub content: RawContent,
}

/// A message as delivered to a recipient: who sent it, and what it carries.
/// `from` is always injected by the router, never taken from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPeerMessage {
    pub from: PeerId,
    pub content: RawContent,
}

/// A presence notification. Always text-framed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
}

/// The union of everything the router can push to a connection's sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSocketMessage {
    FromPeer(ReceivedPeerMessage),
    FromRelay(RoomEvent),
}
