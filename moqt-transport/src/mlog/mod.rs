//! MoQ Transport event logging (mlog) following qlog patterns.
//!
//! Produces qlog-compatible JSON-SEQ files that can be aggregated with QUIC
//! qlog files for end-to-end timing analysis. Event coverage: control
//! messages in both directions, data stream headers, and playout eviction.

mod events;
mod writer;

pub use events::*;
pub use writer::MlogWriter;
