use super::{Decode, DecodeError, Encode, EncodeError};

/// The address of an object within a track: a group and an object sequence.
///
/// The derived ordering compares the group first and the object second,
/// which is the delivery order restored by the playout buffer.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Location {
    pub group: u64,
    pub object: u64,
}

impl Location {
    pub fn new(group: u64, object: u64) -> Self {
        Self { group, object }
    }

    /// The next object within the same group.
    pub fn next_object(self) -> Self {
        Self::new(self.group, self.object + 1)
    }

    /// The first object of the next group.
    pub fn next_group(self) -> Self {
        Self::new(self.group + 1, 0)
    }
}

impl Decode for Location {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let group = u64::decode(r)?;
        let object = u64::decode(r)?;
        Ok(Self::new(group, object))
    }
}

impl Encode for Location {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.group.encode(w)?;
        self.object.encode(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::cmp::Ordering;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let loc = Location::new(81, 16500);
        loc.encode(&mut buf).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            buf.to_vec(),
            vec![
                0x40, 0x51, // 81 as a 2-byte VarInt
                0x80, 0x00, 0x40, 0x74, // 16500 as a 4-byte VarInt
            ]
        );
        let decoded = Location::decode(&mut buf).unwrap();
        assert_eq!(decoded, loc);
    }

    #[test]
    fn total_order() {
        let a = Location::new(1, 1);
        let b = Location::new(1, 2);
        let c = Location::new(2, 1);

        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&c), Ordering::Less);
        assert_eq!(c.cmp(&b), Ordering::Greater);
        assert_eq!(a.cmp(&a), Ordering::Equal);

        // Object increments stay below the next group start.
        assert!(a < a.next_object());
        assert!(a.next_object() < a.next_group());
    }
}
