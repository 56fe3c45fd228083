use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Standalone fetch vs a fetch joined to an existing subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchType {
    Standalone = 0x1,
    /// Join relative to the subscription's largest group.
    Relative = 0x2,
    /// Join at an absolute group.
    Absolute = 0x3,
}

impl Encode for FetchType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for FetchType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x1 => Ok(Self::Standalone),
            0x2 => Ok(Self::Relative),
            0x3 => Ok(Self::Absolute),
            other => Err(DecodeError::InvalidFetchType(other)),
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
            (FetchType::Standalone, 0x01u8),
            (FetchType::Relative, 0x02),
            (FetchType::Absolute, 0x03),
        ] {
            let mut buf = BytesMut::new();
            ft.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), vec![byte]);
            assert_eq!(FetchType::decode(&mut buf).unwrap(), ft);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x04u8].into();
        let result = FetchType::decode(&mut buf);
        assert!(matches!(result, Err(DecodeError::InvalidFetchType(0x04))));
    }
}
