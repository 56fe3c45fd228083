use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs, Location,
};

/// How a track's objects are mapped onto the transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ForwardingPreference {
    /// Objects ride ordered unidirectional streams, one per subgroup.
    Subgroup = 0x0,
    /// Objects ride individual QUIC datagrams.
    Datagram = 0x1,
}

impl Encode for ForwardingPreference {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for ForwardingPreference {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::Subgroup),
            0x1 => Ok(Self::Datagram),
            other => Err(DecodeError::InvalidForwardingPreference(other)),
        }
    }
}

/// A single media object: the unit the playout buffer reorders and the media
/// pipeline consumes.
///
/// The payload is a [bytes::Bytes] so enqueueing transfers ownership without
/// copying.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MoqtObject {
    pub full_track_name: FullTrackName,
    pub location: Location,

    /// Publisher priority, where smaller values are sent first.
    pub publisher_priority: u8,

    pub forwarding_preference: ForwardingPreference,
    /// Present exactly when the forwarding preference is Subgroup.
    pub subgroup_id: Option<u64>,

    pub extension_headers: KeyValuePairs,
    pub payload: bytes::Bytes,
}

impl MoqtObject {
    /// Fails when the subgroup id does not match the forwarding preference.
    pub fn try_new(
        full_track_name: FullTrackName,
        location: Location,
        publisher_priority: u8,
        forwarding_preference: ForwardingPreference,
        subgroup_id: Option<u64>,
        extension_headers: KeyValuePairs,
        payload: bytes::Bytes,
    ) -> Result<Self, EncodeError> {
        match (forwarding_preference, subgroup_id) {
            (ForwardingPreference::Subgroup, None) => {
                return Err(EncodeError::MissingField("SubgroupId".to_string()))
            }
            (ForwardingPreference::Datagram, Some(_)) => return Err(EncodeError::InvalidValue),
            _ => {}
        }

        Ok(Self {
            full_track_name,
            location,
            publisher_priority,
            forwarding_preference,
            subgroup_id,
            extension_headers,
            payload,
        })
    }

    /// Serialize everything but the track name, which travels separately as
    /// an alias. The frame order matches the per-stream object frames.
    pub fn encode_frame<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.location.encode(w)?;
        self.publisher_priority.encode(w)?;

        self.forwarding_preference.encode(w)?;
        match (self.forwarding_preference, self.subgroup_id) {
            (ForwardingPreference::Subgroup, Some(subgroup_id)) => subgroup_id.encode(w)?,
            (ForwardingPreference::Subgroup, None) => {
                return Err(EncodeError::MissingField("SubgroupId".to_string()))
            }
            (ForwardingPreference::Datagram, Some(_)) => return Err(EncodeError::InvalidValue),
            (ForwardingPreference::Datagram, None) => {}
        }

        self.extension_headers.encode(w)?;

        self.payload.len().encode(w)?;
        u8::encode_remaining(w, self.payload.len())?;
        w.put_slice(&self.payload);

        Ok(())
    }

    /// The inverse of [MoqtObject::encode_frame]; the track name comes from
    /// the session's alias table.
    pub fn decode_frame<R: bytes::Buf>(
        full_track_name: FullTrackName,
        r: &mut R,
    ) -> Result<Self, DecodeError> {
        let location = Location::decode(r)?;
        let publisher_priority = u8::decode(r)?;

        let forwarding_preference = ForwardingPreference::decode(r)?;
        let subgroup_id = match forwarding_preference {
            ForwardingPreference::Subgroup => Some(u64::decode(r)?),
            ForwardingPreference::Datagram => None,
        };

        let extension_headers = KeyValuePairs::decode(r)?;

        let payload_length = usize::decode(r)?;
        u8::decode_remaining(r, payload_length)?;
        let payload = r.copy_to_bytes(payload_length);

        Ok(Self {
            full_track_name,
            location,
            publisher_priority,
            forwarding_preference,
            subgroup_id,
            extension_headers,
            payload,
        })
    }
}
