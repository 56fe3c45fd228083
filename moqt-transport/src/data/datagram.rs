use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs, Location,
};
use crate::data::{ForwardingPreference, MoqtObject};

/// A single object sent as a QUIC datagram, for tracks with the Datagram
/// forwarding preference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Datagram {
    pub track_alias: u64,
    pub location: Location,
    pub publisher_priority: u8,
    pub extension_headers: KeyValuePairs,
    pub payload: bytes::Bytes,
}

impl Datagram {
    pub fn into_object(self, full_track_name: FullTrackName) -> MoqtObject {
        MoqtObject {
            full_track_name,
            location: self.location,
            publisher_priority: self.publisher_priority,
            forwarding_preference: ForwardingPreference::Datagram,
            subgroup_id: None,
            extension_headers: self.extension_headers,
            payload: self.payload,
        }
    }

    /// Fails unless the object uses the Datagram forwarding preference.
    pub fn try_from_object(track_alias: u64, object: MoqtObject) -> Result<Self, EncodeError> {
        if object.forwarding_preference != ForwardingPreference::Datagram {
            return Err(EncodeError::InvalidValue);
        }

        Ok(Self {
            track_alias,
            location: object.location,
            publisher_priority: object.publisher_priority,
            extension_headers: object.extension_headers,
            payload: object.payload,
        })
    }
}

impl Decode for Datagram {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let track_alias = u64::decode(r)?;
        let location = Location::decode(r)?;
        let publisher_priority = u8::decode(r)?;
        let extension_headers = KeyValuePairs::decode(r)?;

        let payload_length = usize::decode(r)?;
        Self::decode_remaining(r, payload_length)?;
        let payload = r.copy_to_bytes(payload_length);

        Ok(Self {
            track_alias,
            location,
            publisher_priority,
            extension_headers,
            payload,
        })
    }
}

impl Encode for Datagram {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.track_alias.encode(w)?;
        self.location.encode(w)?;
        self.publisher_priority.encode(w)?;
        self.extension_headers.encode(w)?;

        self.payload.len().encode(w)?;
        Self::encode_remaining(w, self.payload.len())?;
        w.put_slice(&self.payload);

        Ok(())
    }
}
