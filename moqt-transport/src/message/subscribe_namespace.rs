use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Tuple};

/// Sent by the subscriber to receive announcements under a namespace prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeNamespace {
    /// The namespace subscription request ID.
    pub id: u64,

    pub namespace_prefix: Tuple,
    pub params: KeyValuePairs,
}

impl Decode for SubscribeNamespace {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let namespace_prefix = Tuple::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            namespace_prefix,
            params,
        })
    }
}

impl Encode for SubscribeNamespace {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.namespace_prefix.encode(w)?;
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

        let msg = SubscribeNamespace {
            id: 12345,
            namespace_prefix: Tuple::from_utf8_path("conf/room1"),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeNamespace::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
