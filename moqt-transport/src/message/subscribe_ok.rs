use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};
use crate::message::GroupOrder;

/// Sent by the publisher to accept a Subscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeOk {
    /// The request ID of the SUBSCRIBE this message is replying to.
    pub id: u64,

    /// Milliseconds after which the subscription is no longer valid; 0 never expires.
    pub expires: u64,

    /// The order groups will be delivered in. Never Original.
    pub group_order: GroupOrder,

    /// When content exists, largest_location is the largest object the
    /// publisher has for this track.
    pub content_exists: bool,
    pub largest_location: Option<Location>,

    pub params: KeyValuePairs,
}

impl Decode for SubscribeOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let expires = u64::decode(r)?;
        let group_order = GroupOrder::decode_response(r)?;
        let content_exists = bool::decode(r)?;
        let largest_location = match content_exists {
            true => Some(Location::decode(r)?),
            false => None,
        };
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            expires,
            group_order,
            content_exists,
            largest_location,
            params,
        })
    }
}

impl Encode for SubscribeOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.expires.encode(w)?;

        if self.group_order == GroupOrder::Original {
            return Err(EncodeError::InvalidValue);
        }
        self.group_order.encode(w)?;

        self.content_exists.encode(w)?;
        if self.content_exists {
            match &self.largest_location {
                Some(largest) => largest.encode(w)?,
                None => return Err(EncodeError::MissingField("LargestLocation".to_string())),
            }
        }

        self.params.encode(w)?;

        Ok(())
    }
}
