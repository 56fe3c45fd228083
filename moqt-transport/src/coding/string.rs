use super::{Decode, DecodeError, Encode, EncodeError};

impl Encode for String {
    /// Encode a string with a varint length prefix.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.len().encode(w)?;
        Self::encode_remaining(w, self.len())?;
        w.put(self.as_ref());
        Ok(())
    }
}

impl Decode for String {
    /// Decode a string with a varint length prefix.
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        Self::decode_remaining(r, size)?;

        let mut buf = vec![0; size];
        r.copy_to_slice(&mut buf);

        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let s = "video".to_string();
        s.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x05, 0x76, 0x69, 0x64, 0x65, 0x6f]);
        let decoded = String::decode(&mut buf).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn decode_invalid_utf8() {
        let mut buf: Bytes = vec![0x02u8, 0xff, 0xfe].into();
        let decoded = String::decode(&mut buf);
        assert!(matches!(decoded.unwrap_err(), DecodeError::InvalidString(_)));
    }

    #[test]
    fn decode_truncated() {
        let mut buf: Bytes = vec![0x05u8, 0x76, 0x69].into();
        let decoded = String::decode(&mut buf);
        assert!(matches!(decoded.unwrap_err(), DecodeError::More(_)));
    }
}
