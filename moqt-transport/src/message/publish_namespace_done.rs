use crate::coding::{Decode, DecodeError, Encode, EncodeError, Tuple};

/// Sent by the publisher to withdraw a namespace announcement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishNamespaceDone {
    pub namespace: Tuple,
}

impl Decode for PublishNamespaceDone {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let namespace = Tuple::decode(r)?;
        Ok(Self { namespace })
    }
}

impl Encode for PublishNamespaceDone {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.namespace.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = PublishNamespaceDone {
            namespace: Tuple::from_utf8_path("conf/room1/alice"),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = PublishNamespaceDone::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
