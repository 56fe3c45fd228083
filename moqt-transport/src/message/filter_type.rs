use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Selects which objects a subscription starts (and stops) delivering at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterType {
    /// Start at the first object of the next group.
    NextGroupStart = 0x1,
    /// Start at the largest object the publisher has seen.
    LatestObject = 0x2,
    /// Start at an absolute location.
    AbsoluteStart = 0x3,
    /// Deliver an absolute range of groups.
    AbsoluteRange = 0x4,
}

impl Encode for FilterType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for FilterType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x1 => Ok(Self::NextGroupStart),
            0x2 => Ok(Self::LatestObject),
            0x3 => Ok(Self::AbsoluteStart),
            0x4 => Ok(Self::AbsoluteRange),
            other => Err(DecodeError::InvalidFilterType(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        for (ft, byte) in [
            (FilterType::NextGroupStart, 0x01u8),
            (FilterType::LatestObject, 0x02),
            (FilterType::AbsoluteStart, 0x03),
            (FilterType::AbsoluteRange, 0x04),
        ] {
            let mut buf = BytesMut::new();
            ft.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), vec![byte]);
            assert_eq!(FilterType::decode(&mut buf).unwrap(), ft);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x05u8].into();
        let result = FilterType::decode(&mut buf);
        assert!(matches!(result, Err(DecodeError::InvalidFilterType(0x05))));
    }
}
