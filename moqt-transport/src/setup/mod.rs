//! Messages used for the MoQ Transport handshake.
//!
//! After the WebTransport session is established, the client opens the
//! bidirectional control stream and sends [Client]; the server answers with
//! [Server], selecting one of the offered versions. Everything else waits
//! until that exchange completes.

mod client;
mod param_types;
mod server;
mod version;

pub use client::*;
pub use param_types::*;
pub use server::*;
pub use version::*;

pub const ALPN: &[u8] = b"moq-00";

/// Setup message type codes.
///
/// 0x40/0x41 framed setup in draft versions <= 10 and 0x01 is reserved from
/// even earlier drafts; we recognize them only to reject them cleanly.
pub const CLIENT_SETUP: u64 = 0x20;
pub const SERVER_SETUP: u64 = 0x21;
pub const LEGACY_CLIENT_SETUP: u64 = 0x40;
pub const LEGACY_SERVER_SETUP: u64 = 0x41;
pub const RESERVED_SETUP: u64 = 0x01;
