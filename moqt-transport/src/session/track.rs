use std::collections::HashMap;

use bytes::BytesMut;

use crate::coding::{Encode, FullTrackName, Location};
use crate::data::{Datagram, ForwardingPreference, MoqtObject, StreamHeader, StreamObject, StreamType};
use crate::message::{self, GroupOrder, SubscribeDoneCode};

use super::{Publisher, SessionError, TrackError, Writer};

/// Publishes one track's objects onto the session.
///
/// Objects with the Subgroup preference map onto one unidirectional stream
/// per (group, subgroup); moving to a newer group finishes the older
/// streams. Datagram-preference objects go out as datagrams.
pub struct TrackWriter {
    publisher: Publisher,

    pub full_track_name: FullTrackName,
    pub track_alias: u64,

    /// Present when this writer answers a SUBSCRIBE; finishing it sends
    /// SUBSCRIBE_DONE with the stream count.
    request_id: Option<u64>,

    streams: HashMap<(u64, u64), Writer>,
    stream_count: u64,
    current_group: u64,
}

impl TrackWriter {
    pub(super) fn new(
        publisher: Publisher,
        full_track_name: FullTrackName,
        track_alias: u64,
        request_id: Option<u64>,
    ) -> Self {
        Self {
            publisher,
            full_track_name,
            track_alias,
            request_id,
            streams: HashMap::new(),
            stream_count: 0,
            current_group: 0,
        }
    }

    /// Send one object, consuming its payload.
    pub async fn push(&mut self, object: MoqtObject) -> Result<(), SessionError> {
        match object.forwarding_preference {
            ForwardingPreference::Subgroup => self.push_stream(object).await,
            ForwardingPreference::Datagram => self.push_datagram(object).await,
        }
    }

    async fn push_stream(&mut self, object: MoqtObject) -> Result<(), SessionError> {
        let group = object.location.group;
        let subgroup = object
            .subgroup_id
            .ok_or_else(|| SessionError::Encode(crate::coding::EncodeError::MissingField(
                "SubgroupId".to_string(),
            )))?;

        // Moving to a newer group finishes every older stream.
        if group > self.current_group {
            self.streams.retain(|(g, _), _| *g >= group);
            self.current_group = group;
        }

        let key = (group, subgroup);
        if !self.streams.contains_key(&key) {
            let stream = self.publisher.open_uni().await?;
            let mut writer = Writer::new(stream);

            writer.encode(&StreamType::Subgroup).await?;
            writer
                .encode(&StreamHeader {
                    track_alias: self.track_alias,
                    group_id: group,
                    subgroup_id: subgroup,
                })
                .await?;

            self.streams.insert(key, writer);
            self.stream_count += 1;
        }

        let frame = StreamObject::try_from_object(object)?;
        let writer = self.streams.get_mut(&key).ok_or(SessionError::Internal)?;
        writer.encode(&frame).await?;

        Ok(())
    }

    async fn push_datagram(&mut self, object: MoqtObject) -> Result<(), SessionError> {
        let datagram = Datagram::try_from_object(self.track_alias, object)?;

        let mut buf = BytesMut::new();
        datagram.encode(&mut buf)?;
        self.publisher.send_datagram(buf.freeze()).await?;

        Ok(())
    }

    /// Finish the track: close every open stream and, when this writer was
    /// serving a SUBSCRIBE, send SUBSCRIBE_DONE.
    pub fn finish(mut self, status_code: SubscribeDoneCode, reason: &str) {
        self.streams.clear();

        if let Some(id) = self.request_id.take() {
            self.publisher.send_message(message::SubscribeDone {
                id,
                status_code,
                stream_count: self.stream_count,
                reason_phrase: crate::coding::ReasonPhrase(reason.to_string()),
            });
            self.publisher.drop_subscribed(id);
        }
    }
}

/// An inbound SUBSCRIBE waiting for the application to serve or reject it.
///
/// Unanswered subscribes report a missing track on drop.
pub struct Subscribed {
    publisher: Publisher,
    responded: bool,

    pub msg: message::Subscribe,
}

impl Subscribed {
    pub(super) fn new(publisher: Publisher, msg: message::Subscribe) -> Self {
        Self {
            publisher,
            responded: false,
            msg,
        }
    }

    /// Accept with SUBSCRIBE_OK and get the writer that serves it.
    pub fn accept(
        mut self,
        group_order: GroupOrder,
        largest_location: Option<Location>,
    ) -> Result<TrackWriter, TrackError> {
        if group_order == GroupOrder::Original {
            return Err(TrackError::Internal(
                "responses must pick a group order".to_string(),
            ));
        }

        self.responded = true;
        self.publisher.send_message(message::SubscribeOk {
            id: self.msg.id,
            expires: 0,
            group_order,
            content_exists: largest_location.is_some(),
            largest_location,
            params: Default::default(),
        });

        self.publisher.register_subscribed(self.msg.id, self.msg.track_alias);

        Ok(TrackWriter::new(
            self.publisher.clone(),
            self.msg.full_track_name.clone(),
            self.msg.track_alias,
            Some(self.msg.id),
        ))
    }

    /// Reject with SUBSCRIBE_ERROR.
    pub fn reject(mut self, err: TrackError) {
        self.responded = true;
        self.publisher.send_message(message::SubscribeError {
            id: self.msg.id,
            error_code: err.code(),
            reason_phrase: err.reason_phrase(),
            track_alias: self.msg.track_alias,
        });
    }
}

impl Drop for Subscribed {
    fn drop(&mut self) {
        if self.responded {
            return;
        }

        self.publisher.send_message(message::SubscribeError {
            id: self.msg.id,
            error_code: TrackError::NotFound.code(),
            reason_phrase: TrackError::NotFound.reason_phrase(),
            track_alias: self.msg.track_alias,
        });
    }
}
