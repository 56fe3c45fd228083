//! Serialization primitives shared by the control and data planes.
//!
//! Everything on the wire is built from QUIC varints, length-prefixed byte
//! fields and a handful of fixed-width integers. The [Decode] and [Encode]
//! traits run over [bytes::Buf]/[bytes::BufMut] so the same code paths serve
//! in-memory buffers and stream cursors.

mod bounded_string;
mod decode;
mod encode;
mod full_track_name;
mod integer;
mod kvp;
mod location;
mod string;
mod tuple;
mod varint;

pub use bounded_string::*;
pub use decode::*;
pub use encode::*;
pub use full_track_name::*;
pub use kvp::*;
pub use location::*;
pub use tuple::*;
pub use varint::*;
