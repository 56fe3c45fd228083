use serde::{Deserialize, Serialize};

use crate::coding::Location;
use crate::data::StreamHeader;
use crate::message::Message;

/// One MoQ Transport event record.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since the session started.
    pub time: f64,

    /// Event name in "moqt:event_name" form.
    pub name: String,

    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventData {
    #[serde(rename = "control_message_created")]
    ControlMessageCreated(ControlMessage),

    #[serde(rename = "control_message_parsed")]
    ControlMessageParsed(ControlMessage),

    #[serde(rename = "stream_header_parsed")]
    StreamHeaderParsed(StreamHeaderEvent),

    #[serde(rename = "playout_evicted")]
    PlayoutEvicted(PlayoutEvicted),
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    pub message_type: String,
    pub type_code: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamHeaderEvent {
    pub track_alias: u64,
    pub group_id: u64,
    pub subgroup_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayoutEvicted {
    pub track_alias: u64,
    pub group_id: u64,
    pub object_id: u64,
    pub dropped: u64,
}

pub fn control_message_created(time: f64, msg: &Message) -> Event {
    Event {
        time,
        name: "moqt:control_message_created".to_string(),
        data: EventData::ControlMessageCreated(ControlMessage {
            message_type: msg.name().to_string(),
            type_code: msg.id(),
        }),
    }
}

pub fn control_message_parsed(time: f64, msg: &Message) -> Event {
    Event {
        time,
        name: "moqt:control_message_parsed".to_string(),
        data: EventData::ControlMessageParsed(ControlMessage {
            message_type: msg.name().to_string(),
            type_code: msg.id(),
        }),
    }
}

pub fn stream_header_parsed(time: f64, header: &StreamHeader) -> Event {
    Event {
        time,
        name: "moqt:stream_header_parsed".to_string(),
        data: EventData::StreamHeaderParsed(StreamHeaderEvent {
            track_alias: header.track_alias,
            group_id: header.group_id,
            subgroup_id: header.subgroup_id,
        }),
    }
}

pub fn playout_evicted(time: f64, track_alias: u64, location: Location, dropped: usize) -> Event {
    Event {
        time,
        name: "moqt:playout_evicted".to_string(),
        data: EventData::PlayoutEvicted(PlayoutEvicted {
            track_alias,
            group_id: location.group,
            object_id: location.object,
            dropped: dropped as u64,
        }),
    }
}
