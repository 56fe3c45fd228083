use crate::coding::{Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs};

/// Sent by a potential subscriber to query the status of a track.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatusRequest {
    /// The status request ID.
    pub id: u64,

    pub full_track_name: FullTrackName,
    pub params: KeyValuePairs,
}

impl Decode for TrackStatusRequest {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let full_track_name = FullTrackName::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            full_track_name,
            params,
        })
    }
}

impl Encode for TrackStatusRequest {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.full_track_name.encode(w)?;
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

        let msg = TrackStatusRequest {
            id: 12345,
            full_track_name: FullTrackName::from_utf8_path("conf/room1", "video"),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = TrackStatusRequest::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
