use super::{Version, LEGACY_SERVER_SETUP, SERVER_SETUP};
use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs};
use bytes::Buf;

/// Sent by the server in response to a client setup.
#[derive(Debug, Clone)]
pub struct Server {
    /// The version selected from the client's offer.
    pub version: Version,

    /// Setup parameters: MAX_REQUEST_ID, AUTHORIZATION_TOKEN, etc.
    pub params: KeyValuePairs,
}

impl Decode for Server {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        match typ {
            SERVER_SETUP => {}
            // Recognized but unsupported: pre-draft-11 setup framing.
            LEGACY_SERVER_SETUP => return Err(DecodeError::InvalidMessage(typ)),
            _ => return Err(DecodeError::InvalidMessage(typ)),
        }

        let len = u16::decode(r)? as usize;
        Self::decode_remaining(r, len)?;

        let mut payload = vec![0; len];
        r.copy_to_slice(&mut payload);
        let mut payload = bytes::Bytes::from(payload);

        let version = Version::decode(&mut payload)?;
        let params = KeyValuePairs::decode(&mut payload)?;

        if payload.has_remaining() {
            return Err(DecodeError::InvalidPayloadLength);
        }

        Ok(Self { version, params })
    }
}

impl Encode for Server {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        SERVER_SETUP.encode(w)?;

        // The u16 length prefix requires encoding the payload first.
        let mut buf = Vec::new();
        self.version.encode(&mut buf)?;
        self.params.encode(&mut buf)?;

        if buf.len() > u16::MAX as usize {
            return Err(EncodeError::MsgBoundsExceeded);
        }
        (buf.len() as u16).encode(w)?;

        Self::encode_remaining(w, buf.len())?;
        w.put_slice(&buf);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::ParameterType;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let mut params = KeyValuePairs::new();
        params
            .set_int(ParameterType::MaxRequestId.into(), 1000)
            .unwrap();

        let server = Server {
            version: Version::DRAFT_11,
            params,
        };

        server.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(
            buf.to_vec(),
            vec![
                0x21, // Type
                0x00, 0x0c, // Length
                0xc0, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00, 0x0b, // DRAFT_11
                0x01, // 1 parameter
                0x02, 0x43, 0xe8, // MaxRequestId = 1000
            ]
        );

        let decoded = Server::decode(&mut buf).unwrap();
        assert_eq!(decoded.version, server.version);
        assert_eq!(decoded.params, server.params);
    }
}
