use crate::coding::{Decode, DecodeError, Encode, EncodeError, SessionUri};

/// Sent by the server to ask the client to drain and reconnect.
///
/// An empty URI means "no redirect": reconnect to the same endpoint.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GoAway {
    pub new_session_uri: SessionUri,
}

impl Decode for GoAway {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let new_session_uri = SessionUri::decode(r)?;
        Ok(Self { new_session_uri })
    }
}

impl Encode for GoAway {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.new_session_uri.encode(w)
    }
}
