use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};
use crate::message::TrackStatusCode;

/// Sent by the publisher in response to a TrackStatusRequest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatus {
    /// The request ID of the TRACK_STATUS_REQUEST this message is replying to.
    pub id: u64,

    pub status_code: TrackStatusCode,

    /// The largest object the publisher has seen. Must be (0, 0) when the
    /// track does not exist or has not yet begun.
    pub largest_location: Location,

    pub params: KeyValuePairs,
}

impl Decode for TrackStatus {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let status_code = TrackStatusCode::decode(r)?;
        let largest_location = Location::decode(r)?;

        if status_code.requires_zero_location() && largest_location != Location::default() {
            return Err(DecodeError::InvalidValue);
        }

        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            status_code,
            largest_location,
            params,
        })
    }
}

impl Encode for TrackStatus {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;

        if self.status_code.requires_zero_location() && self.largest_location != Location::default()
        {
            return Err(EncodeError::InvalidValue);
        }
        self.status_code.encode(w)?;
        self.largest_location.encode(w)?;

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

        let msg = TrackStatus {
            id: 12345,
            status_code: TrackStatusCode::InProgress,
            largest_location: Location::new(81, 81),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = TrackStatus::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn missing_track_requires_zero_location() {
        let mut buf = BytesMut::new();

        let msg = TrackStatus {
            id: 12345,
            status_code: TrackStatusCode::DoesNotExist,
            largest_location: Location::new(1, 0),
            params: Default::default(),
        };
        let encoded = msg.encode(&mut buf);
        assert!(matches!(encoded.unwrap_err(), EncodeError::InvalidValue));

        let msg = TrackStatus {
            id: 12345,
            status_code: TrackStatusCode::NotYetBegun,
            largest_location: Location::default(),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = TrackStatus::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
