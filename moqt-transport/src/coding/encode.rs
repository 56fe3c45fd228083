use super::BoundsExceeded;

use thiserror::Error;

/// Encode a type to a byte buffer.
pub trait Encode {
    fn encode<W: bytes::BufMut>(&self, buf: &mut W) -> Result<(), EncodeError>;

    /// Helper to make sure the buffer has enough space before writing.
    fn encode_remaining<W: bytes::BufMut>(buf: &mut W, required: usize) -> Result<(), EncodeError> {
        let needed = required.saturating_sub(buf.remaining_mut());
        if needed > 0 {
            Err(EncodeError::More(needed))
        } else {
            Ok(())
        }
    }
}

/// An encode error.
#[derive(Error, Debug, Clone)]
pub enum EncodeError {
    #[error("short buffer: {0} more bytes")]
    More(usize),

    /// A value the wire format cannot represent (wrong key parity, a group
    /// order that is not allowed in this message, ...).
    #[error("invalid value")]
    InvalidValue,

    /// An end group that precedes the start group.
    #[error("invalid range")]
    InvalidRange,

    /// A conditional field was required by another field but not set.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A length-bounded field exceeded its limit.
    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    /// A control message payload exceeded the u16 length prefix.
    #[error("message bounds exceeded")]
    MsgBoundsExceeded,

    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] BoundsExceeded),
}
