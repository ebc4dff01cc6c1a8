//! The room registry and its owning task.
//!
//! The registry is never touched from more than one place: every mutation
//! arrives as a [`RouterRequest`] on a single `mpsc` mailbox drained by the
//! task spawned in [`spawn_router`]. This is what gives the per-request
//! atomicity the presence semantics depend on -- there is no lock to race
//! against, because there is only ever one task holding the map.

use std::collections::HashMap;

use roomrelay_core::{Destination, PeerId, PeerSocketMessage, RawContent, ReceivedPeerMessage, RoomEvent, RoomId};
use tokio::sync::mpsc;
use tracing::warn;

/// The delivery endpoint a connection handler exposes to the router. Sends
/// are non-blocking from the router's perspective; a closed or lagging
/// receiver just drops the event.
pub type PeerSink = mpsc::UnboundedSender<PeerSocketMessage>;

/// A request the router processes. Handlers only ever talk to the registry
/// through these.
#[derive(Debug)]
pub enum RouterRequest {
    AddPeer {
        room_id: RoomId,
        peer_id: PeerId,
        sink: PeerSink,
    },
    RemovePeer {
        room_id: RoomId,
        peer_id: PeerId,
    },
    RelayPeerMessage {
        room_id: RoomId,
        from: PeerId,
        destination: Destination,
        content: RawContent,
    },
}

#[derive(Default)]
struct Room {
    peers: HashMap<PeerId, PeerSink>,
}

#[derive(Default)]
struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    fn add_peer(&mut self, room_id: RoomId, peer_id: PeerId, sink: PeerSink) {
        let room = self.rooms.entry(room_id).or_default();

        for (existing_id, existing_sink) in &room.peers {
            push(existing_sink, PeerSocketMessage::FromRelay(RoomEvent::PeerJoined(peer_id.clone())));
            push(&sink, PeerSocketMessage::FromRelay(RoomEvent::PeerJoined(existing_id.clone())));
        }

        room.peers.insert(peer_id, sink);
    }

    fn remove_peer(&mut self, room_id: &RoomId, peer_id: &PeerId) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.peers.remove(peer_id).is_none() {
            return;
        }

        for sink in room.peers.values() {
            push(sink, PeerSocketMessage::FromRelay(RoomEvent::PeerLeft(peer_id.clone())));
        }

        if room.peers.is_empty() {
            self.rooms.remove(room_id);
        }
    }

    fn relay_peer_message(&self, room_id: &RoomId, from: &PeerId, destination: &Destination, content: &RawContent) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };

        let recipients: Vec<&PeerSink> = match destination {
            Destination::Broadcast => room
                .peers
                .iter()
                .filter(|(peer_id, _)| *peer_id != from)
                .map(|(_, sink)| sink)
                .collect(),
            Destination::PeerSet(ids) => ids.iter().filter_map(|id| room.peers.get(id)).collect(),
        };

        for sink in recipients {
            push(
                sink,
                PeerSocketMessage::FromPeer(ReceivedPeerMessage {
                    from: from.clone(),
                    content: content.clone(),
                }),
            );
        }
    }
}

/// Pushes an event to a sink, logging and dropping it on saturation/closure
/// rather than letting the router block.
fn push(sink: &PeerSink, message: PeerSocketMessage) {
    if sink.send(message).is_err() {
        warn!("dropping event for a sink whose connection has already gone away");
    }
}

/// A cheaply-clonable capability to submit requests to the router's mailbox.
/// Holding one does not grant access to the registry itself -- only the
/// router task ever reads it.
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::UnboundedSender<RouterRequest>,
}

impl RouterHandle {
    pub fn add_peer(&self, room_id: RoomId, peer_id: PeerId, sink: PeerSink) {
        let _ = self.tx.send(RouterRequest::AddPeer { room_id, peer_id, sink });
    }

    pub fn remove_peer(&self, room_id: RoomId, peer_id: PeerId) {
        let _ = self.tx.send(RouterRequest::RemovePeer { room_id, peer_id });
    }

    pub fn relay_peer_message(&self, room_id: RoomId, from: PeerId, destination: Destination, content: RawContent) {
        let _ = self.tx.send(RouterRequest::RelayPeerMessage {
            room_id,
            from,
            destination,
            content,
        });
    }
}

/// Spawns the single router task and returns a handle to its mailbox. The
/// task runs for the lifetime of the process; it never exits on its own and
/// never fails a request.
pub fn spawn_router() -> RouterHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<RouterRequest>();

    tokio::spawn(async move {
        let mut registry = RoomRegistry::default();
        while let Some(request) = rx.recv().await {
            match request {
                RouterRequest::AddPeer { room_id, peer_id, sink } => registry.add_peer(room_id, peer_id, sink),
                RouterRequest::RemovePeer { room_id, peer_id } => registry.remove_peer(&room_id, &peer_id),
                RouterRequest::RelayPeerMessage {
                    room_id,
                    from,
                    destination,
                    content,
                } => registry.relay_peer_message(&room_id, &from, &destination, &content),
            }
        }
    });

    RouterHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (PeerSink, mpsc::UnboundedReceiver<PeerSocketMessage>) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PeerSocketMessage>) -> Vec<PeerSocketMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn presence_symmetry_on_join() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        let (bob_tx, mut bob_rx) = sink();

        registry.add_peer("room".into(), "alice".into(), alice_tx);
        assert!(drain(&mut alice_rx).is_empty());

        registry.add_peer("room".into(), "bob".into(), bob_tx);
        assert_eq!(
            drain(&mut alice_rx),
            vec![PeerSocketMessage::FromRelay(RoomEvent::PeerJoined("bob".into()))]
        );
        assert_eq!(
            drain(&mut bob_rx),
            vec![PeerSocketMessage::FromRelay(RoomEvent::PeerJoined("alice".into()))]
        );
    }

    #[test]
    fn leave_notifies_remaining_peers_exactly_once() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        let (bob_tx, _bob_rx) = sink();
        registry.add_peer("room".into(), "alice".into(), alice_tx);
        registry.add_peer("room".into(), "bob".into(), bob_tx);
        drain(&mut alice_rx);

        registry.remove_peer(&"room".to_owned(), &"bob".to_owned());

        assert_eq!(
            drain(&mut alice_rx),
            vec![PeerSocketMessage::FromRelay(RoomEvent::PeerLeft("bob".into()))]
        );
    }

    #[test]
    fn removing_unknown_peer_is_a_silent_no_op() {
        let mut registry = RoomRegistry::default();
        registry.remove_peer(&"ghost-room".to_owned(), &"nobody".to_owned());
    }

    #[test]
    fn broadcast_excludes_sender() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        let (bob_tx, mut bob_rx) = sink();
        let (carol_tx, mut carol_rx) = sink();
        registry.add_peer("room".into(), "alice".into(), alice_tx);
        registry.add_peer("room".into(), "bob".into(), bob_tx);
        registry.add_peer("room".into(), "carol".into(), carol_tx);
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        registry.relay_peer_message(
            &"room".to_owned(),
            &"alice".to_owned(),
            &Destination::Broadcast,
            &RawContent::Text("hi".into()),
        );

        assert!(drain(&mut alice_rx).is_empty());
        for rx in [&mut bob_rx, &mut carol_rx] {
            assert_eq!(
                drain(rx),
                vec![PeerSocketMessage::FromPeer(ReceivedPeerMessage {
                    from: "alice".into(),
                    content: RawContent::Text("hi".into()),
                })]
            );
        }
    }

    #[test]
    fn peer_set_can_include_sender() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        registry.add_peer("room".into(), "alice".into(), alice_tx);
        drain(&mut alice_rx);

        registry.relay_peer_message(
            &"room".to_owned(),
            &"alice".to_owned(),
            &Destination::PeerSet(vec!["alice".into()]),
            &RawContent::Text("echo".into()),
        );

        assert_eq!(
            drain(&mut alice_rx),
            vec![PeerSocketMessage::FromPeer(ReceivedPeerMessage {
                from: "alice".into(),
                content: RawContent::Text("echo".into()),
            })]
        );
    }

    #[test]
    fn unknown_recipients_are_silently_skipped() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        registry.add_peer("room".into(), "alice".into(), alice_tx);
        drain(&mut alice_rx);

        registry.relay_peer_message(
            &"room".to_owned(),
            &"alice".to_owned(),
            &Destination::PeerSet(vec!["nonexistent".into()]),
            &RawContent::Text("hi".into()),
        );

        assert!(drain(&mut alice_rx).is_empty());
    }

    #[test]
    fn message_to_unknown_room_is_a_silent_no_op() {
        let registry = RoomRegistry::default();
        registry.relay_peer_message(
            &"ghost".to_owned(),
            &"alice".to_owned(),
            &Destination::Broadcast,
            &RawContent::Text("hi".into()),
        );
    }

    #[test]
    fn room_is_deleted_once_empty_and_is_indistinguishable_from_absent() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, _alice_rx) = sink();
        registry.add_peer("room".into(), "alice".into(), alice_tx);
        registry.remove_peer(&"room".to_owned(), &"alice".to_owned());

        assert!(registry.rooms.get("room").is_none());
        // A second remove against the now-absent room is still a no-op.
        registry.remove_peer(&"room".to_owned(), &"alice".to_owned());
    }

    #[test]
    fn cross_room_isolation() {
        let mut registry = RoomRegistry::default();
        let (alice_tx, mut alice_rx) = sink();
        let (bob_tx, mut bob_rx) = sink();
        registry.add_peer("foo".into(), "alice".into(), alice_tx);
        registry.add_peer("bar".into(), "bob".into(), bob_tx);
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        registry.relay_peer_message(
            &"foo".to_owned(),
            &"alice".to_owned(),
            &Destination::Broadcast,
            &RawContent::Text("hi".into()),
        );

        assert!(drain(&mut bob_rx).is_empty());
    }
}
