use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// The order groups are delivered in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupOrder {
    /// Defer to the publisher's order. Not allowed in responses.
    Original = 0x0,
    Ascending = 0x1,
    Descending = 0x2,
}

impl GroupOrder {
    /// Decode, rejecting [GroupOrder::Original]. Responses must pick one.
    pub fn decode_response<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match Self::decode(r)? {
            Self::Original => Err(DecodeError::InvalidGroupOrder(0)),
            order => Ok(order),
        }
    }
}

impl Encode for GroupOrder {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u8).encode(w)
    }
}

impl Decode for GroupOrder {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0x0 => Ok(Self::Original),
            0x1 => Ok(Self::Ascending),
            0x2 => Ok(Self::Descending),
            other => Err(DecodeError::InvalidGroupOrder(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        for (go, byte) in [
            (GroupOrder::Original, 0x00u8),
            (GroupOrder::Ascending, 0x01),
            (GroupOrder::Descending, 0x02),
        ] {
            let mut buf = BytesMut::new();
            go.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), vec![byte]);
            assert_eq!(GroupOrder::decode(&mut buf).unwrap(), go);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x03u8].into();
        let result = GroupOrder::decode(&mut buf);
        assert!(matches!(result, Err(DecodeError::InvalidGroupOrder(0x03))));
    }

    #[test]
    fn decode_response_rejects_original() {
        let mut buf: Bytes = vec![0x00u8].into();
        let result = GroupOrder::decode_response(&mut buf);
        assert!(matches!(result, Err(DecodeError::InvalidGroupOrder(0))));
    }
}
