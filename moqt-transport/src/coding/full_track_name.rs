use super::{Decode, DecodeError, Encode, EncodeError, Tuple};
use std::fmt;

/// A globally unique track identifier: a namespace tuple plus a track name.
///
/// On the wire this is shortened to a per-session track alias negotiated by
/// SUBSCRIBE; the full name only appears in control messages.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FullTrackName {
    pub namespace: Tuple,
    pub name: String,
}

impl FullTrackName {
    pub fn new(namespace: Tuple, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Build from a `/`-separated namespace path and a track name.
    pub fn from_utf8_path(namespace: &str, name: &str) -> Self {
        Self::new(Tuple::from_utf8_path(namespace), name)
    }
}

impl Decode for FullTrackName {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let namespace = Tuple::decode(r)?;
        let name = String::decode(r)?;
        Ok(Self { namespace, name })
    }
}

impl Encode for FullTrackName {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.namespace.encode(w)?;
        self.name.encode(w)?;
        Ok(())
    }
}

impl fmt::Debug for FullTrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace.to_utf8_path(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let name = FullTrackName::from_utf8_path("conf/room1", "video");
        name.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x02, // 2 namespace fields
            0x04, 0x63, 0x6f, 0x6e, 0x66, // "conf"
            0x05, 0x72, 0x6f, 0x6f, 0x6d, 0x31, // "room1"
            0x05, 0x76, 0x69, 0x64, 0x65, 0x6f, // name "video"
        ]);
        let decoded = FullTrackName::decode(&mut buf).unwrap();
        assert_eq!(decoded, name);
    }
}
