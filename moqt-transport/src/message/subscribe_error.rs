use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// SUBSCRIBE_ERROR codes from the request error registry.
pub mod error_code {
    pub const INTERNAL_ERROR: u64 = 0x0;
    pub const UNAUTHORIZED: u64 = 0x1;
    pub const TIMEOUT: u64 = 0x2;
    pub const NOT_SUPPORTED: u64 = 0x3;
    pub const TRACK_DOES_NOT_EXIST: u64 = 0x4;
    pub const INVALID_RANGE: u64 = 0x5;
    pub const RETRY_TRACK_ALIAS: u64 = 0x6;
}

/// Sent by the publisher to reject a Subscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeError {
    /// The request ID of the SUBSCRIBE this message is replying to.
    pub id: u64,

    pub error_code: u64,
    pub reason_phrase: ReasonPhrase,

    /// With RETRY_TRACK_ALIAS, the alias the subscriber should retry with.
    pub track_alias: u64,
}

impl SubscribeError {
    pub fn is_retry(&self) -> bool {
        self.error_code == error_code::RETRY_TRACK_ALIAS
    }
}

impl Decode for SubscribeError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let error_code = u64::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;
        let track_alias = u64::decode(r)?;

        Ok(Self {
            id,
            error_code,
            reason_phrase,
            track_alias,
        })
    }
}

impl Encode for SubscribeError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.error_code.encode(w)?;
        self.reason_phrase.encode(w)?;
        self.track_alias.encode(w)?;

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

        let msg = SubscribeError {
            id: 12345,
            error_code: error_code::RETRY_TRACK_ALIAS,
            reason_phrase: ReasonPhrase("alias taken".to_string()),
            track_alias: 17,
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeError::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.is_retry());
    }
}
