//! Pure encode/decode functions for the relay's wire protocol.
//!
//! A message on the wire is header lines, an empty line, then an optional
//! body:
//!
//! ```text
//! <key1>:<value1>
//! <key2>:<value2>
//!
//! <body>
//! ```
//!
//! The header/body separator is the two-byte sequence `\n\n`. No I/O, no
//! clocks, no randomness -- the contract is byte-exact so independent
//! implementations interoperate.

use crate::error::CodecError;
use crate::message::{Destination, PeerSocketMessage, RawContent, ReceivedPeerMessage, RoomEvent, SentPeerMessage};

const DELIMITER: &[u8] = b"\n\n";

/// Splits `bytes` on the first occurrence of `\n\n`. If absent, the whole
/// input is the header section and the body is empty.
fn split_header_body(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.windows(2).position(|w| w == DELIMITER) {
        Some(pos) => (&bytes[..pos], &bytes[pos + 2..]),
        None => (bytes, &[]),
    }
}

/// Parses header lines, trimming keys and values and skipping lines without
/// a colon (they carry no header).
fn parse_headers(header_str: &str) -> Vec<(&str, &str)> {
    header_str
        .split('\n')
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn decode_body(body: &[u8], is_binary: bool) -> Result<RawContent, CodecError> {
    if is_binary {
        Ok(RawContent::Binary(body.to_vec()))
    } else {
        let text = std::str::from_utf8(body).map_err(|_| CodecError::InvalidHeaderEncoding)?;
        Ok(RawContent::Text(text.to_owned()))
    }
}

/// A header value embedding a raw `\n` would corrupt the delimiter once
/// framed; reject it rather than emit an ambiguous frame.
fn validate_header_value(value: &str) -> Result<(), CodecError> {
    if value.contains('\n') {
        return Err(CodecError::InvalidDelimiter);
    }
    Ok(())
}

/// Decodes a client-sent message. `is_binary` must reflect the WebSocket
/// frame type the bytes arrived in.
pub fn decode_sent_message(bytes: &[u8], is_binary: bool) -> Result<SentPeerMessage, CodecError> {
    let (header_bytes, body_bytes) = split_header_body(bytes);
    let header_str = std::str::from_utf8(header_bytes).map_err(|_| CodecError::InvalidHeaderEncoding)?;
    let headers = parse_headers(header_str);

    let destination = if headers.iter().any(|(key, _)| *key == "broadcast") {
        Destination::Broadcast
    } else {
        let recipients: Vec<String> = headers
            .iter()
            .filter(|(key, _)| *key == "to")
            .map(|(_, value)| (*value).to_owned())
            .collect();
        if recipients.is_empty() {
            return Err(CodecError::NoRecipients);
        }
        Destination::PeerSet(recipients)
    };

    let content = decode_body(body_bytes, is_binary)?;
    Ok(SentPeerMessage { destination, content })
}

/// Decodes a relay-sent message: either a presence `RoomEvent` or a
/// `ReceivedPeerMessage`, distinguished by which recognized header is present.
pub fn decode_relay_message(bytes: &[u8], is_binary: bool) -> Result<PeerSocketMessage, CodecError> {
    let (header_bytes, body_bytes) = split_header_body(bytes);
    let header_str = std::str::from_utf8(header_bytes).map_err(|_| CodecError::InvalidHeaderEncoding)?;
    let headers = parse_headers(header_str);

    for (key, value) in headers {
        match key {
            "peer_joined" => return Ok(PeerSocketMessage::FromRelay(RoomEvent::PeerJoined(value.to_owned()))),
            "peer_left" => return Ok(PeerSocketMessage::FromRelay(RoomEvent::PeerLeft(value.to_owned()))),
            "message_from" => {
                let content = decode_body(body_bytes, is_binary)?;
                return Ok(PeerSocketMessage::FromPeer(ReceivedPeerMessage {
                    from: value.to_owned(),
                    content,
                }));
            }
            _ => continue,
        }
    }
    Err(CodecError::UnknownHeader)
}

/// Encodes a client-sent message. The caller frames the result as a text or
/// binary WebSocket frame according to `msg.content`'s tag.
pub fn encode_sent_message(msg: &SentPeerMessage) -> Result<Vec<u8>, CodecError> {
    let mut header = String::new();
    match &msg.destination {
        Destination::Broadcast => header.push_str("broadcast:"),
        Destination::PeerSet(ids) => {
            for (index, id) in ids.iter().enumerate() {
                validate_header_value(id)?;
                if index > 0 {
                    header.push('\n');
                }
                header.push_str("to: ");
                header.push_str(id);
            }
        }
    }

    let mut out = header.into_bytes();
    out.extend_from_slice(DELIMITER);
    match &msg.content {
        RawContent::Text(text) => out.extend_from_slice(text.as_bytes()),
        RawContent::Binary(data) => out.extend_from_slice(data),
    }
    Ok(out)
}

/// Encodes a `ReceivedPeerMessage`. The caller frames the result as text or
/// binary according to `msg.content`'s tag.
pub fn encode_received_message(msg: &ReceivedPeerMessage) -> Result<Vec<u8>, CodecError> {
    validate_header_value(&msg.from)?;
    let mut out = format!("message_from:{}", msg.from).into_bytes();
    out.extend_from_slice(DELIMITER);
    match &msg.content {
        RawContent::Text(text) => out.extend_from_slice(text.as_bytes()),
        RawContent::Binary(data) => out.extend_from_slice(data),
    }
    Ok(out)
}

/// Encodes a `RoomEvent`. No body, no trailing delimiter, always text-framed.
/// Peer ids are always relay-generated and cannot contain `\n`, so this never
/// fails.
#[must_use]
pub fn encode_room_event(event: &RoomEvent) -> Vec<u8> {
    match event {
        RoomEvent::PeerJoined(id) => format!("peer_joined:{id}").into_bytes(),
        RoomEvent::PeerLeft(id) => format!("peer_left:{id}").into_bytes(),
    }
}
