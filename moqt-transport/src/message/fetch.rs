use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs, Location,
};
use crate::message::{FetchType, GroupOrder};

/// Track properties for a standalone fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StandaloneFetch {
    pub full_track_name: FullTrackName,
    pub start_location: Location,
    /// Exclusive end; must not precede the start.
    pub end_location: Location,
}

impl Decode for StandaloneFetch {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let full_track_name = FullTrackName::decode(r)?;
        let start_location = Location::decode(r)?;
        let end_location = Location::decode(r)?;

        if end_location.group < start_location.group {
            return Err(DecodeError::InvalidRange);
        }

        Ok(Self {
            full_track_name,
            start_location,
            end_location,
        })
    }
}

impl Encode for StandaloneFetch {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        if self.end_location.group < self.start_location.group {
            return Err(EncodeError::InvalidRange);
        }

        self.full_track_name.encode(w)?;
        self.start_location.encode(w)?;
        self.end_location.encode(w)?;

        Ok(())
    }
}

/// Joining properties for relative and absolute joining fetches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoiningFetch {
    /// The request ID of the subscription being joined.
    pub joining_request_id: u64,
    pub joining_start: u64,
}

impl Decode for JoiningFetch {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let joining_request_id = u64::decode(r)?;
        let joining_start = u64::decode(r)?;

        Ok(Self {
            joining_request_id,
            joining_start,
        })
    }
}

impl Encode for JoiningFetch {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.joining_request_id.encode(w)?;
        self.joining_start.encode(w)?;

        Ok(())
    }
}

/// Sent by the subscriber to request a range of already published objects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fetch {
    /// The fetch request ID.
    pub id: u64,

    pub subscriber_priority: u8,
    pub group_order: GroupOrder,

    pub fetch_type: FetchType,
    /// Present for Standalone fetches.
    pub standalone: Option<StandaloneFetch>,
    /// Present for Relative and Absolute joining fetches.
    pub joining: Option<JoiningFetch>,

    pub params: KeyValuePairs,
}

impl Fetch {
    pub fn new_standalone(
        id: u64,
        subscriber_priority: u8,
        group_order: GroupOrder,
        full_track_name: FullTrackName,
        start_location: Location,
        end_location: Location,
        params: KeyValuePairs,
    ) -> Result<Self, EncodeError> {
        if end_location.group < start_location.group {
            return Err(EncodeError::InvalidRange);
        }

        Ok(Self {
            id,
            subscriber_priority,
            group_order,
            fetch_type: FetchType::Standalone,
            standalone: Some(StandaloneFetch {
                full_track_name,
                start_location,
                end_location,
            }),
            joining: None,
            params,
        })
    }

    pub fn new_joining(
        id: u64,
        subscriber_priority: u8,
        group_order: GroupOrder,
        fetch_type: FetchType,
        joining_request_id: u64,
        joining_start: u64,
        params: KeyValuePairs,
    ) -> Result<Self, EncodeError> {
        if fetch_type == FetchType::Standalone {
            return Err(EncodeError::InvalidValue);
        }

        Ok(Self {
            id,
            subscriber_priority,
            group_order,
            fetch_type,
            standalone: None,
            joining: Some(JoiningFetch {
                joining_request_id,
                joining_start,
            }),
            params,
        })
    }
}

impl Decode for Fetch {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let subscriber_priority = u8::decode(r)?;
        let group_order = GroupOrder::decode(r)?;

        let fetch_type = FetchType::decode(r)?;
        let (standalone, joining) = match fetch_type {
            FetchType::Standalone => (Some(StandaloneFetch::decode(r)?), None),
            FetchType::Relative | FetchType::Absolute => (None, Some(JoiningFetch::decode(r)?)),
        };

        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            subscriber_priority,
            group_order,
            fetch_type,
            standalone,
            joining,
            params,
        })
    }
}

impl Encode for Fetch {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.subscriber_priority.encode(w)?;
        self.group_order.encode(w)?;

        self.fetch_type.encode(w)?;
        match self.fetch_type {
            FetchType::Standalone => match &self.standalone {
                Some(standalone) => standalone.encode(w)?,
                None => return Err(EncodeError::MissingField("StandaloneFetch".to_string())),
            },
            FetchType::Relative | FetchType::Absolute => match &self.joining {
                Some(joining) => joining.encode(w)?,
                None => return Err(EncodeError::MissingField("JoiningFetch".to_string())),
            },
        }

        self.params.encode(w)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode_standalone() {
        let mut buf = BytesMut::new();

        let msg = Fetch::new_standalone(
            12345,
            127,
            GroupOrder::Ascending,
            FullTrackName::from_utf8_path("conf/room1", "video"),
            Location::new(34, 0),
            Location::new(53, 0),
            Default::default(),
        )
        .unwrap();
        msg.encode(&mut buf).unwrap();
        let decoded = Fetch::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_decode_joining() {
        for fetch_type in [FetchType::Relative, FetchType::Absolute] {
            let mut buf = BytesMut::new();

            let msg = Fetch::new_joining(
                12345,
                127,
                GroupOrder::Descending,
                fetch_type,
                382,
                3463,
                Default::default(),
            )
            .unwrap();
            msg.encode(&mut buf).unwrap();
            let decoded = Fetch::decode(&mut buf).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn reject_inverted_range() {
        let msg = Fetch::new_standalone(
            1,
            127,
            GroupOrder::Ascending,
            FullTrackName::from_utf8_path("conf", "video"),
            Location::new(10, 0),
            Location::new(9, 0),
            Default::default(),
        );
        assert!(matches!(msg.unwrap_err(), EncodeError::InvalidRange));
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        let msg = Fetch {
            id: 1,
            subscriber_priority: 127,
            group_order: GroupOrder::Ascending,
            fetch_type: FetchType::Absolute,
            standalone: None,
            joining: None,
            params: Default::default(),
        };
        let encoded = msg.encode(&mut buf);
        assert!(matches!(encoded.unwrap_err(), EncodeError::MissingField(_)));
    }
}
