use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase, Tuple};

/// Sent by the subscriber to revoke a previously accepted announcement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishNamespaceCancel {
    pub namespace: Tuple,
    pub error_code: u64,
    pub reason_phrase: ReasonPhrase,
}

impl Decode for PublishNamespaceCancel {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let namespace = Tuple::decode(r)?;
        let error_code = u64::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;

        Ok(Self {
            namespace,
            error_code,
            reason_phrase,
        })
    }
}

impl Encode for PublishNamespaceCancel {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.namespace.encode(w)?;
        self.error_code.encode(w)?;
        self.reason_phrase.encode(w)?;

        Ok(())
    }
}
