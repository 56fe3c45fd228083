use crate::coding::{EncodeError, KeyValuePair, KeyValuePairs};

/// Typed views over the LOC extension headers carried by media objects.
///
/// These are the extension ids the conferencing pipeline understands; any
/// other id passes through [KeyValuePairs] untouched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LocExtension {
    /// Epoch milliseconds at capture, from the (corrected) wall clock.
    CaptureTimestamp(u64),
    VideoFrameMarking(u64),
    AudioLevel(u64),
    /// Opaque codec configuration, e.g. an SPS/PPS blob.
    VideoConfig(Vec<u8>),
}

impl LocExtension {
    pub const CAPTURE_TIMESTAMP: u64 = 2;
    pub const VIDEO_FRAME_MARKING: u64 = 4;
    pub const AUDIO_LEVEL: u64 = 6;
    pub const VIDEO_CONFIG: u64 = 13;

    /// Interpret a pair as a known LOC extension, if it is one.
    pub fn from_kvp(kvp: &KeyValuePair) -> Option<Self> {
        match kvp.key {
            Self::CAPTURE_TIMESTAMP => kvp.as_int().map(Self::CaptureTimestamp),
            Self::VIDEO_FRAME_MARKING => kvp.as_int().map(Self::VideoFrameMarking),
            Self::AUDIO_LEVEL => kvp.as_int().map(Self::AudioLevel),
            Self::VIDEO_CONFIG => kvp.as_bytes().map(|b| Self::VideoConfig(b.to_vec())),
            _ => None,
        }
    }

    pub fn to_kvp(&self) -> KeyValuePair {
        // The known ids all satisfy the parity rule, so these cannot fail.
        match self {
            Self::CaptureTimestamp(v) => KeyValuePair::try_new_int(Self::CAPTURE_TIMESTAMP, *v),
            Self::VideoFrameMarking(v) => KeyValuePair::try_new_int(Self::VIDEO_FRAME_MARKING, *v),
            Self::AudioLevel(v) => KeyValuePair::try_new_int(Self::AUDIO_LEVEL, *v),
            Self::VideoConfig(v) => KeyValuePair::try_new_bytes(Self::VIDEO_CONFIG, v.clone()),
        }
        .unwrap()
    }

    /// All recognized LOC extensions in an extension header list.
    pub fn parse_all(headers: &KeyValuePairs) -> Vec<LocExtension> {
        headers.iter().filter_map(Self::from_kvp).collect()
    }

    /// Append to an extension header list.
    pub fn add_to(&self, headers: &mut KeyValuePairs) -> Result<(), EncodeError> {
        if matches!(self, Self::VideoConfig(v) if v.len() > KeyValuePair::MAX_BYTES_LEN) {
            return Err(EncodeError::FieldBoundsExceeded("VideoConfig".to_string()));
        }
        headers.push(self.to_kvp());
        Ok(())
    }
}
