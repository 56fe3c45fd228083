use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};
use crate::message::GroupOrder;

/// Sent by the publisher to accept a Fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchOk {
    /// The request ID of the FETCH this message is replying to.
    pub id: u64,

    /// The order the fetched groups will arrive in. Never Original.
    pub group_order: GroupOrder,

    /// Whether the fetch range covers the end of the track.
    pub end_of_track: bool,

    /// The largest object covered by this fetch.
    pub end_location: Location,

    pub params: KeyValuePairs,
}

impl Decode for FetchOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let group_order = GroupOrder::decode_response(r)?;
        let end_of_track = bool::decode(r)?;
        let end_location = Location::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            group_order,
            end_of_track,
            end_location,
            params,
        })
    }
}

impl Encode for FetchOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;

        if self.group_order == GroupOrder::Original {
            return Err(EncodeError::InvalidValue);
        }
        self.group_order.encode(w)?;

        self.end_of_track.encode(w)?;
        self.end_location.encode(w)?;
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

        let msg = FetchOk {
            id: 12345,
            group_order: GroupOrder::Ascending,
            end_of_track: true,
            end_location: Location::new(53, 12),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = FetchOk::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_original_order() {
        let mut buf = BytesMut::new();

        let msg = FetchOk {
            id: 12345,
            group_order: GroupOrder::Original,
            end_of_track: false,
            end_location: Location::default(),
            params: Default::default(),
        };
        let encoded = msg.encode(&mut buf);
        assert!(matches!(encoded.unwrap_err(), EncodeError::InvalidValue));
    }
}
