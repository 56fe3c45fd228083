use super::{Decode, DecodeError, Encode, EncodeError};

impl Encode for u8 {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        Self::encode_remaining(w, 1)?;
        w.put_u8(*self);
        Ok(())
    }
}

impl Decode for u8 {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        Self::decode_remaining(r, 1)?;
        Ok(r.get_u8())
    }
}

impl Encode for u16 {
    /// Encode a u16 in network byte order.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        Self::encode_remaining(w, 2)?;
        w.put_u16(*self);
        Ok(())
    }
}

impl Decode for u16 {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        Self::decode_remaining(r, 2)?;
        Ok(r.get_u16())
    }
}

impl Encode for bool {
    /// Encode a bool as a single byte, 0 or 1.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        Self::encode_remaining(w, 1)?;
        w.put_u8(*self as u8);
        Ok(())
    }
}

impl Decode for bool {
    /// Any byte other than 0 or 1 is a protocol violation.
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode_u8() {
        let mut buf = BytesMut::new();

        0xa5u8.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0xa5]);
        assert_eq!(u8::decode(&mut buf).unwrap(), 0xa5);
    }

    #[test]
    fn encode_decode_u16() {
        let mut buf = BytesMut::new();

        0x1234u16.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x12, 0x34]);
        assert_eq!(u16::decode(&mut buf).unwrap(), 0x1234);
    }

    #[test]
    fn encode_decode_bool() {
        let mut buf = BytesMut::new();

        true.encode(&mut buf).unwrap();
        false.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x01, 0x00]);
        assert!(bool::decode(&mut buf).unwrap());
        assert!(!bool::decode(&mut buf).unwrap());
    }

    #[test]
    fn decode_invalid_bool() {
        let mut buf: Bytes = vec![0x02u8].into();
        let decoded = bool::decode(&mut buf);
        assert!(matches!(decoded.unwrap_err(), DecodeError::InvalidValue));
    }
}
