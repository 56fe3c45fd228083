//! The data plane: objects and the framing that carries them.
//!
//! Objects reach the subscriber over dedicated unidirectional streams (one
//! per subgroup, ordered within themselves but not across streams) or as
//! datagrams. The playout buffer restores cross-stream order by [Location].

mod datagram;
mod loc;
mod object;
mod stream;

pub use datagram::*;
pub use loc::*;
pub use object::*;
pub use stream::*;
