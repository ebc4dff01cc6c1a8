use thiserror::Error;

/// Errors the wire codec can report. All are permanent: the caller logs and
/// discards the offending frame rather than retrying.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A header value contained a raw `\n`, which would corrupt the
    /// header/body delimiter if encoded.
    #[error("header value contains a raw newline and cannot be framed")]
    InvalidDelimiter,
    /// The header section of a binary frame was not valid UTF-8.
    #[error("header section is not valid UTF-8")]
    InvalidHeaderEncoding,
    /// A client-sent message carried neither `broadcast` nor any `to` header.
    #[error("message specified no recipients")]
    NoRecipients,
    /// A relay-sent message carried none of `peer_joined`, `peer_left`, or
    /// `message_from`.
    #[error("no recognized relay header was present")]
    UnknownHeader,
}
