use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs, Location,
};
use crate::data::{ForwardingPreference, MoqtObject};

/// Stream type codes; the first varint on every unidirectional data stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamType {
    /// A subgroup of a subscribed track.
    Subgroup = 0x4,
    /// The response stream of a FETCH.
    Fetch = 0x5,
}

impl Encode for StreamType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for StreamType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x4 => Ok(Self::Subgroup),
            0x5 => Ok(Self::Fetch),
            other => Err(DecodeError::InvalidMessage(other)),
        }
    }
}

/// The header that opens a subgroup data stream, identifying which
/// subscription and GOP the following objects belong to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamHeader {
    pub track_alias: u64,
    pub group_id: u64,
    pub subgroup_id: u64,
}

impl Decode for StreamHeader {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let track_alias = u64::decode(r)?;
        let group_id = u64::decode(r)?;
        let subgroup_id = u64::decode(r)?;

        Ok(Self {
            track_alias,
            group_id,
            subgroup_id,
        })
    }
}

impl Encode for StreamHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.track_alias.encode(w)?;
        self.group_id.encode(w)?;
        self.subgroup_id.encode(w)?;

        Ok(())
    }
}

/// One object frame within a subgroup stream.
///
/// The group and subgroup come from the stream header; only the object
/// sequence is repeated per frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamObject {
    pub object_id: u64,
    pub publisher_priority: u8,
    pub extension_headers: KeyValuePairs,
    pub payload: bytes::Bytes,
}

impl StreamObject {
    /// Rebuild the full object from this frame plus its stream header and
    /// the track name resolved from the alias table.
    pub fn into_object(self, header: &StreamHeader, full_track_name: FullTrackName) -> MoqtObject {
        MoqtObject {
            full_track_name,
            location: Location::new(header.group_id, self.object_id),
            publisher_priority: self.publisher_priority,
            forwarding_preference: ForwardingPreference::Subgroup,
            subgroup_id: Some(header.subgroup_id),
            extension_headers: self.extension_headers,
            payload: self.payload,
        }
    }

    /// The stream-scoped frame of an object; fails unless the object uses
    /// the Subgroup forwarding preference.
    pub fn try_from_object(object: MoqtObject) -> Result<Self, EncodeError> {
        if object.forwarding_preference != ForwardingPreference::Subgroup {
            return Err(EncodeError::InvalidValue);
        }

        Ok(Self {
            object_id: object.location.object,
            publisher_priority: object.publisher_priority,
            extension_headers: object.extension_headers,
            payload: object.payload,
        })
    }
}

impl Decode for StreamObject {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;
        let extension_headers = KeyValuePairs::decode(r)?;

        let payload_length = usize::decode(r)?;
        Self::decode_remaining(r, payload_length)?;
        let payload = r.copy_to_bytes(payload_length);

        Ok(Self {
            object_id,
            publisher_priority,
            extension_headers,
            payload,
        })
    }
}

impl Encode for StreamObject {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;
        self.extension_headers.encode(w)?;

        self.payload.len().encode(w)?;
        Self::encode_remaining(w, self.payload.len())?;
        w.put_slice(&self.payload);

        Ok(())
    }
}

/// The header that opens a fetch response stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchHeader {
    /// The request ID of the FETCH this stream answers.
    pub request_id: u64,
}

impl Decode for FetchHeader {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let request_id = u64::decode(r)?;
        Ok(Self { request_id })
    }
}

impl Encode for FetchHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.request_id.encode(w)?;
        Ok(())
    }
}

/// One object frame within a fetch stream. Fetches span groups, so each
/// frame carries the full location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchObject {
    pub group_id: u64,
    pub subgroup_id: u64,
    pub object_id: u64,
    pub publisher_priority: u8,
    pub extension_headers: KeyValuePairs,
    pub payload: bytes::Bytes,
}

impl FetchObject {
    pub fn into_object(self, full_track_name: FullTrackName) -> MoqtObject {
        MoqtObject {
            full_track_name,
            location: Location::new(self.group_id, self.object_id),
            publisher_priority: self.publisher_priority,
            forwarding_preference: ForwardingPreference::Subgroup,
            subgroup_id: Some(self.subgroup_id),
            extension_headers: self.extension_headers,
            payload: self.payload,
        }
    }
}

impl Decode for FetchObject {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let group_id = u64::decode(r)?;
        let subgroup_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;
        let extension_headers = KeyValuePairs::decode(r)?;

        let payload_length = usize::decode(r)?;
        Self::decode_remaining(r, payload_length)?;
        let payload = r.copy_to_bytes(payload_length);

        Ok(Self {
            group_id,
            subgroup_id,
            object_id,
            publisher_priority,
            extension_headers,
            payload,
        })
    }
}

impl Encode for FetchObject {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.subgroup_id.encode(w)?;
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;
        self.extension_headers.encode(w)?;

        self.payload.len().encode(w)?;
        Self::encode_remaining(w, self.payload.len())?;
        w.put_slice(&self.payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode_header() {
        let mut buf = BytesMut::new();

        let header = StreamHeader {
            track_alias: 999,
            group_id: 81,
            subgroup_id: 0,
        };
        header.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x43, 0xe7, // alias 999
            0x40, 0x51, // group 81
            0x00, // subgroup 0
        ]);
        let decoded = StreamHeader::decode(&mut buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn object_roundtrip_through_stream() {
        let mut buf = BytesMut::new();

        let header = StreamHeader {
            track_alias: 7,
            group_id: 2,
            subgroup_id: 1,
        };
        let name = FullTrackName::from_utf8_path("conf/room1", "video");

        let object = MoqtObject::try_new(
            name.clone(),
            Location::new(2, 5),
            31,
            ForwardingPreference::Subgroup,
            Some(1),
            Default::default(),
            bytes::Bytes::from_static(b"delta frame"),
        )
        .unwrap();

        let frame = StreamObject::try_from_object(object.clone()).unwrap();
        frame.encode(&mut buf).unwrap();

        let decoded = StreamObject::decode(&mut buf).unwrap();
        let rebuilt = decoded.into_object(&header, name);
        assert_eq!(rebuilt, object);
    }

    #[test]
    fn fetch_object_roundtrip() {
        let mut buf = BytesMut::new();

        let frame = FetchObject {
            group_id: 4,
            subgroup_id: 0,
            object_id: 9,
            publisher_priority: 127,
            extension_headers: Default::default(),
            payload: bytes::Bytes::from_static(b"historical"),
        };
        frame.encode(&mut buf).unwrap();
        let decoded = FetchObject::decode(&mut buf).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn datagram_preference_rejected_on_stream() {
        let object = MoqtObject::try_new(
            FullTrackName::from_utf8_path("conf", "audio"),
            Location::new(0, 0),
            0,
            ForwardingPreference::Datagram,
            None,
            Default::default(),
            bytes::Bytes::new(),
        )
        .unwrap();

        let frame = StreamObject::try_from_object(object);
        assert!(matches!(frame.unwrap_err(), EncodeError::InvalidValue));
    }
}
