use super::{Decode, DecodeError, Encode, EncodeError};
use std::fmt;

/// The value half of a [KeyValuePair], selected by the key's parity.
#[derive(Clone, Eq, PartialEq)]
pub enum Value {
    /// Even keys carry a varint.
    Int(u64),
    /// Odd keys carry a length-prefixed blob of at most 65535 bytes.
    Bytes(Vec<u8>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bytes(bytes) => {
                // Preview at most 16 bytes in hex.
                let preview: Vec<String> =
                    bytes.iter().take(16).map(|b| format!("{:02x}", b)).collect();
                write!(f, "[{}]", preview.join(" "))
            }
        }
    }
}

/// A typed parameter, used on setup, subscribe, fetch and announce messages
/// as well as object extension headers.
#[derive(Clone, Eq, PartialEq)]
pub struct KeyValuePair {
    pub key: u64,
    pub value: Value,
}

impl KeyValuePair {
    pub const MAX_BYTES_LEN: usize = 65535;

    /// A varint pair; the key must be even.
    pub fn try_new_int(key: u64, value: u64) -> Result<Self, EncodeError> {
        if key % 2 != 0 {
            return Err(EncodeError::InvalidValue);
        }
        Ok(Self {
            key,
            value: Value::Int(value),
        })
    }

    /// A blob pair; the key must be odd and the blob at most 65535 bytes.
    pub fn try_new_bytes(key: u64, value: Vec<u8>) -> Result<Self, EncodeError> {
        if key % 2 == 0 {
            return Err(EncodeError::InvalidValue);
        }
        if value.len() > Self::MAX_BYTES_LEN {
            return Err(EncodeError::FieldBoundsExceeded("KeyValuePair".to_string()));
        }
        Ok(Self {
            key,
            value: Value::Bytes(value),
        })
    }

    pub fn as_int(&self) -> Option<u64> {
        match self.value {
            Value::Int(v) => Some(v),
            Value::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Int(_) => None,
            Value::Bytes(v) => Some(v),
        }
    }
}

impl Decode for KeyValuePair {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let key = u64::decode(r)?;

        if key % 2 == 0 {
            let value = u64::decode(r)?;
            Ok(Self {
                key,
                value: Value::Int(value),
            })
        } else {
            let length = usize::decode(r)?;
            if length > Self::MAX_BYTES_LEN {
                return Err(DecodeError::FieldBoundsExceeded("KeyValuePair".to_string()));
            }

            Self::decode_remaining(r, length)?;
            let mut buf = vec![0; length];
            r.copy_to_slice(&mut buf);
            Ok(Self {
                key,
                value: Value::Bytes(buf),
            })
        }
    }
}

impl Encode for KeyValuePair {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        match &self.value {
            Value::Int(v) => {
                if self.key % 2 != 0 {
                    return Err(EncodeError::InvalidValue);
                }
                self.key.encode(w)?;
                v.encode(w)?;
            }
            Value::Bytes(v) => {
                if self.key % 2 == 0 {
                    return Err(EncodeError::InvalidValue);
                }
                if v.len() > Self::MAX_BYTES_LEN {
                    return Err(EncodeError::FieldBoundsExceeded("KeyValuePair".to_string()));
                }
                self.key.encode(w)?;
                v.len().encode(w)?;
                Self::encode_remaining(w, v.len())?;
                w.put_slice(v);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {:?}}}", self.key, self.value)
    }
}

/// An ordered, count-prefixed list of [KeyValuePair]s.
///
/// Duplicate keys are allowed; extension-header semantics decide whether a
/// repeat is meaningful, so the codec does not reject them.
#[derive(Default, Clone, Eq, PartialEq)]
pub struct KeyValuePairs(pub Vec<KeyValuePair>);

impl KeyValuePairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kvp: KeyValuePair) {
        self.0.push(kvp);
    }

    pub fn set_int(&mut self, key: u64, value: u64) -> Result<(), EncodeError> {
        self.push(KeyValuePair::try_new_int(key, value)?);
        Ok(())
    }

    pub fn set_bytes(&mut self, key: u64, value: Vec<u8>) -> Result<(), EncodeError> {
        self.push(KeyValuePair::try_new_bytes(key, value)?);
        Ok(())
    }

    pub fn has(&self, key: u64) -> bool {
        self.0.iter().any(|kvp| kvp.key == key)
    }

    /// The first pair with the given key.
    pub fn get(&self, key: u64) -> Option<&KeyValuePair> {
        self.0.iter().find(|kvp| kvp.key == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValuePair> {
        self.0.iter()
    }
}

impl Decode for KeyValuePairs {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let count = usize::decode(r)?;

        let mut kvps = Vec::new();
        for _ in 0..count {
            kvps.push(KeyValuePair::decode(r)?);
        }

        Ok(Self(kvps))
    }
}

impl Encode for KeyValuePairs {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.0.len().encode(w)?;
        for kvp in &self.0 {
            kvp.encode(w)?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyValuePairs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn constructor_parity() {
        // Odd key with a varint value is rejected.
        let kvp = KeyValuePair::try_new_int(1, 10);
        assert!(matches!(kvp.unwrap_err(), EncodeError::InvalidValue));

        // Even key with a blob value is rejected.
        let kvp = KeyValuePair::try_new_bytes(2, vec![0x01]);
        assert!(matches!(kvp.unwrap_err(), EncodeError::InvalidValue));

        // Oversized blob is rejected.
        let kvp = KeyValuePair::try_new_bytes(1, vec![0; 65536]);
        assert!(matches!(
            kvp.unwrap_err(),
            EncodeError::FieldBoundsExceeded(_)
        ));

        assert!(KeyValuePair::try_new_int(0, 10).is_ok());
        assert!(KeyValuePair::try_new_bytes(1, vec![0; 65535]).is_ok());
    }

    #[test]
    fn encode_decode_int() {
        let mut buf = BytesMut::new();

        let kvp = KeyValuePair::try_new_int(100, 100).unwrap();
        kvp.encode(&mut buf).unwrap();
        // Both 100s land in the 2-byte VarInt range.
        assert_eq!(buf.to_vec(), vec![0x40, 0x64, 0x40, 0x64]);
        let decoded = KeyValuePair::decode(&mut buf).unwrap();
        assert_eq!(decoded, kvp);
    }

    #[test]
    fn encode_decode_bytes() {
        let mut buf = BytesMut::new();

        let kvp = KeyValuePair::try_new_bytes(1, vec![0x01, 0x02, 0x03]).unwrap();
        kvp.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x01, 0x03, 0x01, 0x02, 0x03]);
        let decoded = KeyValuePair::decode(&mut buf).unwrap();
        assert_eq!(decoded, kvp);
    }

    #[test]
    fn encode_decode_list() {
        let mut buf = BytesMut::new();

        let mut kvps = KeyValuePairs::new();
        kvps.set_int(0, 10).unwrap();
        kvps.set_bytes(1, b"DemoString".to_vec()).unwrap();
        kvps.encode(&mut buf).unwrap();

        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x02, // 2 parameters
            0x00, 0x0a, // key 0, value 10
            0x01, 0x0a, // key 1, 10 byte blob
            0x44, 0x65, 0x6d, 0x6f, 0x53, 0x74, 0x72, 0x69, 0x6e, 0x67, // "DemoString"
        ]);

        let decoded = KeyValuePairs::decode(&mut buf).unwrap();
        assert_eq!(decoded, kvps);
        assert_eq!(decoded.get(0).unwrap().as_int(), Some(10));
        assert_eq!(
            decoded.get(1).unwrap().as_bytes(),
            Some(b"DemoString".as_slice())
        );
    }

    #[test]
    fn decode_oversized_blob() {
        let mut buf = BytesMut::new();
        // Key 1, declared length 65536.
        1u64.encode(&mut buf).unwrap();
        65536usize.encode(&mut buf).unwrap();
        buf.extend_from_slice(&[0u8; 16]);

        let decoded = KeyValuePair::decode(&mut buf);
        assert!(matches!(
            decoded.unwrap_err(),
            DecodeError::FieldBoundsExceeded(_)
        ));
    }
}
