use super::BoundsExceeded;
use std::str;

use thiserror::Error;

/// Decode a type from a byte buffer.
///
/// Implementations must not consume any bytes on failure beyond what the
/// caller can roll back: the session [Reader](crate::session) decodes from a
/// cursor and only commits the consumed prefix once decoding succeeds, so a
/// [DecodeError::More] simply means "wait for more bytes and retry".
pub trait Decode: Sized {
    fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;

    /// Helper to make sure the buffer has enough bytes before reading.
    fn decode_remaining<B: bytes::Buf>(buf: &mut B, required: usize) -> Result<(), DecodeError> {
        let needed = required.saturating_sub(buf.remaining());
        if needed > 0 {
            Err(DecodeError::More(needed))
        } else {
            Ok(())
        }
    }
}

/// A decode error.
#[derive(Error, Debug, Clone)]
pub enum DecodeError {
    /// The buffer ran out; at least this many more bytes are needed.
    #[error("fill the buffer: {0} more bytes")]
    More(usize),

    #[error("invalid payload length")]
    InvalidPayloadLength,

    #[error("invalid message type: {0}")]
    InvalidMessage(u64),

    #[error("invalid filter type: {0}")]
    InvalidFilterType(u64),

    #[error("invalid group order: {0}")]
    InvalidGroupOrder(u8),

    #[error("invalid fetch type: {0}")]
    InvalidFetchType(u64),

    #[error("invalid track status code: {0}")]
    InvalidTrackStatusCode(u64),

    #[error("invalid subscribe done code: {0}")]
    InvalidSubscribeDoneCode(u64),

    #[error("invalid forwarding preference: {0}")]
    InvalidForwardingPreference(u64),

    /// A field value the wire format does not allow (bad bool, Original
    /// group order in a response, a largest location where none may be).
    #[error("invalid value")]
    InvalidValue,

    /// An end group that precedes the start group.
    #[error("invalid range")]
    InvalidRange,

    /// Key parity did not match the value kind.
    #[error("key value formatting error")]
    KeyValueFormat,

    /// A length-bounded field exceeded its limit.
    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    #[error("invalid string")]
    InvalidString(#[from] str::Utf8Error),

    /// A varint was out of range for the requested type.
    #[error("bounds exceeded")]
    BoundsExceeded(#[from] BoundsExceeded),
}

impl From<std::string::FromUtf8Error> for DecodeError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::InvalidString(err.utf8_error())
    }
}
