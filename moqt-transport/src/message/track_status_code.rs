use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// The state of a track as reported by TRACK_STATUS.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackStatusCode {
    InProgress = 0x0,
    DoesNotExist = 0x1,
    NotYetBegun = 0x2,
    Finished = 0x3,
    RelayUnavailable = 0x4,
}

impl TrackStatusCode {
    /// Statuses with no content; their largest location must be (0, 0).
    pub fn requires_zero_location(&self) -> bool {
        matches!(self, Self::DoesNotExist | Self::NotYetBegun)
    }
}

impl Encode for TrackStatusCode {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for TrackStatusCode {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::InProgress),
            0x1 => Ok(Self::DoesNotExist),
            0x2 => Ok(Self::NotYetBegun),
            0x3 => Ok(Self::Finished),
            0x4 => Ok(Self::RelayUnavailable),
            other => Err(DecodeError::InvalidTrackStatusCode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x05u8].into();
        let result = TrackStatusCode::decode(&mut buf);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidTrackStatusCode(0x05))
        ));
    }
}
