use crate::coding::{Decode, DecodeError, Encode, EncodeError, Tuple};

/// Sent by the subscriber to stop receiving announcements for a prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsubscribeNamespace {
    pub namespace_prefix: Tuple,
}

impl Decode for UnsubscribeNamespace {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let namespace_prefix = Tuple::decode(r)?;
        Ok(Self { namespace_prefix })
    }
}

impl Encode for UnsubscribeNamespace {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.namespace_prefix.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = UnsubscribeNamespace {
            namespace_prefix: Tuple::from_utf8_path("conf/room1"),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = UnsubscribeNamespace::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
