use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Tuple};

/// Sent by the publisher to declare that it serves tracks in a namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishNamespace {
    /// The announcement request ID.
    pub id: u64,

    pub namespace: Tuple,
    pub params: KeyValuePairs,
}

impl Decode for PublishNamespace {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let namespace = Tuple::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            namespace,
            params,
        })
    }
}

impl Encode for PublishNamespace {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.namespace.encode(w)?;
        self.params.encode(w)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = PublishNamespace {
            id: 12345,
            namespace: Tuple::from_utf8_path("conf/room1/alice"),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = PublishNamespace::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
