use std::fmt;

use thiserror::Error;

use super::{Decode, DecodeError, Encode, EncodeError};

/// A value was out of range for the target type.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("value out of range")]
pub struct BoundsExceeded;

/// A QUIC variable-length integer, holding values in `0..2^62`.
///
/// Encoded in 1, 2, 4 or 8 bytes; the two most significant bits of the first
/// byte select the length and the remaining bits carry the value in network
/// byte order. The writer always picks the smallest encoding, the reader
/// accepts any valid one.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarInt(u64);

impl VarInt {
    pub const MAX: Self = Self((1 << 62) - 1);

    /// Construct from a u32, which always fits.
    pub const fn from_u32(v: u32) -> Self {
        Self(v as u64)
    }

    /// The underlying value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for VarInt {
    type Error = BoundsExceeded;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        if v <= Self::MAX.0 {
            Ok(Self(v))
        } else {
            Err(BoundsExceeded)
        }
    }
}

impl TryFrom<usize> for VarInt {
    type Error = BoundsExceeded;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        Self::try_from(v as u64)
    }
}

impl From<VarInt> for u64 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

impl TryFrom<VarInt> for u32 {
    type Error = BoundsExceeded;

    fn try_from(v: VarInt) -> Result<Self, Self::Error> {
        u32::try_from(v.0).map_err(|_| BoundsExceeded)
    }
}

impl TryFrom<VarInt> for usize {
    type Error = BoundsExceeded;

    fn try_from(v: VarInt) -> Result<Self, Self::Error> {
        usize::try_from(v.0).map_err(|_| BoundsExceeded)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Decode for VarInt {
    /// Decode a varint of 1, 2, 4 or 8 bytes.
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        Self::decode_remaining(r, 1)?;
        let first = r.get_u8();

        let extra = match first >> 6 {
            0b00 => 0,
            0b01 => 1,
            0b10 => 3,
            0b11 => 7,
            _ => unreachable!(),
        };
        Self::decode_remaining(r, extra)?;

        let mut value = (first & 0b0011_1111) as u64;
        for _ in 0..extra {
            value = (value << 8) | r.get_u8() as u64;
        }

        Ok(Self(value))
    }
}

impl Encode for VarInt {
    /// Encode a varint using the smallest possible representation.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        let x = self.0;
        if x < (1 << 6) {
            Self::encode_remaining(w, 1)?;
            w.put_u8(x as u8);
        } else if x < (1 << 14) {
            Self::encode_remaining(w, 2)?;
            w.put_u16(0b01 << 14 | x as u16);
        } else if x < (1 << 30) {
            Self::encode_remaining(w, 4)?;
            w.put_u32(0b10 << 30 | x as u32);
        } else if x < (1 << 62) {
            Self::encode_remaining(w, 8)?;
            w.put_u64(0b11 << 62 | x);
        } else {
            unreachable!("varint exceeds 62 bits")
        }

        Ok(())
    }
}

impl Decode for u64 {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        Ok(VarInt::decode(r)?.into_inner())
    }
}

impl Encode for u64 {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        VarInt::try_from(*self)?.encode(w)
    }
}

impl Decode for usize {
    /// Decode a varint-sized length, failing if it does not fit the host.
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        let v = VarInt::decode(r)?;
        Ok(usize::try_from(v)?)
    }
}

impl Encode for usize {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        VarInt::try_from(*self)?.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    fn roundtrip(v: u64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        v.encode(&mut buf).unwrap();
        let encoded = buf.to_vec();
        let decoded = u64::decode(&mut buf).unwrap();
        assert_eq!(decoded, v);
        encoded
    }

    #[test]
    fn encode_boundaries() {
        // Largest 1-byte value.
        assert_eq!(roundtrip(63), vec![0x3f]);
        // Smallest 2-byte value.
        assert_eq!(roundtrip(64), vec![0x40, 0x40]);
        // Largest 2-byte value.
        assert_eq!(roundtrip(16383), vec![0x7f, 0xff]);
        // Smallest 4-byte value.
        assert_eq!(roundtrip(16384), vec![0x80, 0x00, 0x40, 0x00]);
        // Largest 4-byte value.
        assert_eq!(roundtrip((1 << 30) - 1), vec![0xbf, 0xff, 0xff, 0xff]);
        // Largest representable value.
        assert_eq!(
            roundtrip((1 << 62) - 1),
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn encode_lengths() {
        for (v, len) in [
            (0u64, 1),
            (63, 1),
            (64, 2),
            (16383, 2),
            (16384, 4),
            ((1 << 30) - 1, 4),
            (1 << 30, 8),
            ((1 << 62) - 1, 8),
        ] {
            let mut buf = BytesMut::new();
            v.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), len, "value {}", v);
        }
    }

    #[test]
    fn encode_too_large() {
        let mut buf = BytesMut::new();
        let encoded = (1u64 << 62).encode(&mut buf);
        assert!(matches!(
            encoded.unwrap_err(),
            EncodeError::BoundsExceeded(_)
        ));
    }

    #[test]
    fn decode_any_length() {
        // The reader accepts non-minimal encodings.
        let mut buf: Bytes = vec![0x40u8, 0x25].into();
        assert_eq!(u64::decode(&mut buf).unwrap(), 37);

        let mut buf: Bytes = vec![0x80u8, 0x00, 0x00, 0x25].into();
        assert_eq!(u64::decode(&mut buf).unwrap(), 37);
    }

    #[test]
    fn decode_truncated() {
        for encoding in [
            vec![0x40u8],
            vec![0x80, 0x00],
            vec![0xc0, 0x00, 0x00, 0x00, 0x00],
        ] {
            let mut buf: Bytes = encoding.into();
            let decoded = VarInt::decode(&mut buf);
            assert!(matches!(decoded.unwrap_err(), DecodeError::More(_)));
        }

        let mut buf = Bytes::new();
        assert!(matches!(
            VarInt::decode(&mut buf).unwrap_err(),
            DecodeError::More(1)
        ));
    }
}
