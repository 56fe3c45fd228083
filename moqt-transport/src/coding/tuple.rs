use super::{Decode, DecodeError, Encode, EncodeError};

/// A single length-prefixed byte string within a [Tuple].
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TupleField {
    pub value: Vec<u8>,
}

impl TupleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_utf8(s: &str) -> Self {
        Self {
            value: s.as_bytes().to_vec(),
        }
    }

    /// View the field as UTF-8, replacing invalid sequences.
    pub fn to_utf8(&self) -> String {
        String::from_utf8_lossy(&self.value).to_string()
    }
}

impl Decode for TupleField {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        Self::decode_remaining(r, size)?;
        let mut value = vec![0; size];
        r.copy_to_slice(&mut value);
        Ok(Self { value })
    }
}

impl Encode for TupleField {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.value.len().encode(w)?;
        Self::encode_remaining(w, self.value.len())?;
        w.put_slice(&self.value);
        Ok(())
    }
}

/// An ordered sequence of fields, used as a track namespace path.
///
/// Fields keep their insertion order; equality and ordering are structural.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tuple {
    pub fields: Vec<TupleField>,
}

impl Tuple {
    pub const MAX_FIELDS: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: TupleField) {
        self.fields.push(field);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when `prefix` matches the leading fields of this tuple.
    pub fn starts_with(&self, prefix: &Tuple) -> bool {
        self.fields.len() >= prefix.fields.len()
            && self.fields[..prefix.fields.len()] == prefix.fields[..]
    }

    /// Split a `/`-separated path into fields. Empty segments are dropped,
    /// so `/room/alice` and `room/alice` produce the same tuple.
    pub fn from_utf8_path(path: &str) -> Self {
        let mut tuple = Tuple::new();
        for part in path.split('/') {
            if part.is_empty() {
                continue;
            }
            tuple.add(TupleField::from_utf8(part));
        }
        tuple
    }

    /// Join the fields back into a `/`-separated path.
    pub fn to_utf8_path(&self) -> String {
        let parts: Vec<String> = self.fields.iter().map(|f| f.to_utf8()).collect();
        parts.join("/")
    }
}

impl Decode for Tuple {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let count = usize::decode(r)?;
        if count > Self::MAX_FIELDS {
            return Err(DecodeError::FieldBoundsExceeded("Tuple fields".to_string()));
        }

        let mut fields = Vec::new();
        for _ in 0..count {
            fields.push(TupleField::decode(r)?);
        }
        Ok(Self { fields })
    }
}

impl Encode for Tuple {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        if self.fields.len() > Self::MAX_FIELDS {
            return Err(EncodeError::FieldBoundsExceeded("Tuple fields".to_string()));
        }
        self.fields.len().encode(w)?;
        for field in &self.fields {
            field.encode(w)?;
        }
        Ok(())
    }
}
