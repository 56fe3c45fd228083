use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, FullTrackName, KeyValuePairs, Location,
};
use crate::message::{FilterType, GroupOrder};

/// Sent by the subscriber to start receiving a track's objects.
///
/// The subscriber proposes the track alias that subsequent data streams will
/// carry instead of the full track name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscribe {
    /// The subscription request ID.
    pub id: u64,

    /// The identifier used for this track in data streams and datagrams.
    pub track_alias: u64,

    /// The track being subscribed to.
    pub full_track_name: FullTrackName,

    /// Subscriber priority, where smaller values are delivered first.
    pub subscriber_priority: u8,
    pub group_order: GroupOrder,

    /// Whether the publisher should forward objects at all.
    pub forward: bool,

    pub filter_type: FilterType,
    /// Present for AbsoluteStart and AbsoluteRange.
    pub start_location: Option<Location>,
    /// Present for AbsoluteRange; inclusive and >= start_location.group.
    pub end_group: Option<u64>,

    pub params: KeyValuePairs,
}

impl Subscribe {
    pub fn new_next_group_start(
        id: u64,
        track_alias: u64,
        full_track_name: FullTrackName,
        subscriber_priority: u8,
        group_order: GroupOrder,
        forward: bool,
        params: KeyValuePairs,
    ) -> Self {
        Self {
            id,
            track_alias,
            full_track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type: FilterType::NextGroupStart,
            start_location: None,
            end_group: None,
            params,
        }
    }

    pub fn new_latest_object(
        id: u64,
        track_alias: u64,
        full_track_name: FullTrackName,
        subscriber_priority: u8,
        group_order: GroupOrder,
        forward: bool,
        params: KeyValuePairs,
    ) -> Self {
        Self {
            id,
            track_alias,
            full_track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type: FilterType::LatestObject,
            start_location: None,
            end_group: None,
            params,
        }
    }

    pub fn new_absolute_start(
        id: u64,
        track_alias: u64,
        full_track_name: FullTrackName,
        subscriber_priority: u8,
        group_order: GroupOrder,
        forward: bool,
        start_location: Location,
        params: KeyValuePairs,
    ) -> Self {
        Self {
            id,
            track_alias,
            full_track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type: FilterType::AbsoluteStart,
            start_location: Some(start_location),
            end_group: None,
            params,
        }
    }

    /// Fails with [EncodeError::InvalidRange] when the end group precedes
    /// the start group.
    #[allow(clippy::too_many_arguments)]
    pub fn new_absolute_range(
        id: u64,
        track_alias: u64,
        full_track_name: FullTrackName,
        subscriber_priority: u8,
        group_order: GroupOrder,
        forward: bool,
        start_location: Location,
        end_group: u64,
        params: KeyValuePairs,
    ) -> Result<Self, EncodeError> {
        if end_group < start_location.group {
            return Err(EncodeError::InvalidRange);
        }

        Ok(Self {
            id,
            track_alias,
            full_track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type: FilterType::AbsoluteRange,
            start_location: Some(start_location),
            end_group: Some(end_group),
            params,
        })
    }
}

impl Decode for Subscribe {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_alias = u64::decode(r)?;
        let full_track_name = FullTrackName::decode(r)?;

        let subscriber_priority = u8::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let forward = bool::decode(r)?;

        let filter_type = FilterType::decode(r)?;
        let (start_location, end_group) = match filter_type {
            FilterType::AbsoluteStart => (Some(Location::decode(r)?), None),
            FilterType::AbsoluteRange => {
                let start = Location::decode(r)?;
                let end_group = u64::decode(r)?;
                if end_group < start.group {
                    return Err(DecodeError::InvalidRange);
                }
                (Some(start), Some(end_group))
            }
            _ => (None, None),
        };

        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            track_alias,
            full_track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type,
            start_location,
            end_group,
            params,
        })
    }
}

impl Encode for Subscribe {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_alias.encode(w)?;
        self.full_track_name.encode(w)?;

        self.subscriber_priority.encode(w)?;
        self.group_order.encode(w)?;
        self.forward.encode(w)?;

        self.filter_type.encode(w)?;
        match self.filter_type {
            FilterType::AbsoluteStart => match &self.start_location {
                Some(start) => start.encode(w)?,
                None => return Err(EncodeError::MissingField("StartLocation".to_string())),
            },
            FilterType::AbsoluteRange => {
                let start = self
                    .start_location
                    .as_ref()
                    .ok_or_else(|| EncodeError::MissingField("StartLocation".to_string()))?;
                let end_group = self
                    .end_group
                    .ok_or_else(|| EncodeError::MissingField("EndGroup".to_string()))?;
                if end_group < start.group {
                    return Err(EncodeError::InvalidRange);
                }
                start.encode(w)?;
                end_group.encode(w)?;
            }
            _ => {}
        }

        self.params.encode(w)?;

        Ok(())
    }
}
