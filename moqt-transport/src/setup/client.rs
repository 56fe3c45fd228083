use super::{Versions, CLIENT_SETUP, LEGACY_CLIENT_SETUP, RESERVED_SETUP};
use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs};
use bytes::Buf;

/// Sent by the client to set up the session.
///
/// Framed like any other control message; 0x20 since draft version 11.
#[derive(Debug, Clone)]
pub struct Client {
    /// The list of supported versions in preferred order.
    pub versions: Versions,

    /// Setup parameters: MAX_REQUEST_ID, AUTHORIZATION_TOKEN, etc.
    pub params: KeyValuePairs,
}

impl Decode for Client {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        match typ {
            CLIENT_SETUP => {}
            // Recognized but unsupported: pre-draft-11 setup framing.
            LEGACY_CLIENT_SETUP | RESERVED_SETUP => return Err(DecodeError::InvalidMessage(typ)),
            _ => return Err(DecodeError::InvalidMessage(typ)),
        }

        let len = u16::decode(r)? as usize;
        Self::decode_remaining(r, len)?;

        let mut payload = vec![0; len];
        r.copy_to_slice(&mut payload);
        let mut payload = bytes::Bytes::from(payload);

        let versions = Versions::decode(&mut payload)?;
        let params = KeyValuePairs::decode(&mut payload)?;

        if payload.has_remaining() {
            return Err(DecodeError::InvalidPayloadLength);
        }

        Ok(Self { versions, params })
    }
}

impl Encode for Client {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        CLIENT_SETUP.encode(w)?;

        // The u16 length prefix requires encoding the payload first.
        let mut buf = Vec::new();
        self.versions.encode(&mut buf)?;
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
    use crate::setup::{ParameterType, Version};
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let mut params = KeyValuePairs::new();
        params
            .set_int(ParameterType::MaxRequestId.into(), 1000)
            .unwrap();

        let client = Client {
            versions: [Version::DRAFT_11].into(),
            params,
        };

        client.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(
            buf.to_vec(),
            vec![
                0x20, // Type
                0x00, 0x0d, // Length
                0x01, // 1 version
                0xc0, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00, 0x0b, // DRAFT_11
                0x01, // 1 parameter
                0x02, 0x43, 0xe8, // MaxRequestId = 1000
            ]
        );

        let decoded = Client::decode(&mut buf).unwrap();
        assert_eq!(decoded.versions, client.versions);
        assert_eq!(decoded.params, client.params);
    }

    #[test]
    fn decode_legacy_type() {
        let mut buf = BytesMut::new();
        // A draft-10 style CLIENT_SETUP (0x40) is not negotiable.
        0x40u64.encode(&mut buf).unwrap();
        0u16.encode(&mut buf).unwrap();

        let decoded = Client::decode(&mut buf);
        assert!(matches!(
            decoded.unwrap_err(),
            DecodeError::InvalidMessage(0x40)
        ));
    }
}
