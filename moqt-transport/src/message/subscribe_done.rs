use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};
use crate::message::SubscribeDoneCode;

/// Sent by the publisher to end a subscription.
///
/// The stream count lets the subscriber know how many data streams to expect
/// before the subscription is fully drained.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeDone {
    /// The request ID of the SUBSCRIBE being ended.
    pub id: u64,

    pub status_code: SubscribeDoneCode,
    pub stream_count: u64,
    pub reason_phrase: ReasonPhrase,
}

impl Decode for SubscribeDone {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let status_code = SubscribeDoneCode::decode(r)?;
        let stream_count = u64::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;

        Ok(Self {
            id,
            status_code,
            stream_count,
            reason_phrase,
        })
    }
}

impl Encode for SubscribeDone {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.status_code.encode(w)?;
        self.stream_count.encode(w)?;
        self.reason_phrase.encode(w)?;

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

        let msg = SubscribeDone {
            id: 12345,
            status_code: SubscribeDoneCode::TrackEnded,
            stream_count: 81,
            reason_phrase: ReasonPhrase("track ended".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeDone::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
