use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Why the publisher ended a subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscribeDoneCode {
    InternalError = 0x0,
    Unauthorized = 0x1,
    TrackEnded = 0x2,
    SubscriptionEnded = 0x3,
    GoingAway = 0x4,
    Expired = 0x5,
    TooFarBehind = 0x6,
}

impl Encode for SubscribeDoneCode {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for SubscribeDoneCode {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::InternalError),
            0x1 => Ok(Self::Unauthorized),
            0x2 => Ok(Self::TrackEnded),
            0x3 => Ok(Self::SubscriptionEnded),
            0x4 => Ok(Self::GoingAway),
            0x5 => Ok(Self::Expired),
            0x6 => Ok(Self::TooFarBehind),
            other => Err(DecodeError::InvalidSubscribeDoneCode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x07u8].into();
        let result = SubscribeDoneCode::decode(&mut buf);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidSubscribeDoneCode(0x07))
        ));
    }
}
