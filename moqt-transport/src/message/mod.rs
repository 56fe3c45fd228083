//! Control messages sent over the bidirectional control stream.
//!
//! Every message is framed as `type (varint) | length (u16) | payload`.
//! The length covers exactly the payload; bytes after it belong to the next
//! frame and are never consumed here. OBJECT data does not use this framing,
//! it flows over dedicated unidirectional streams (see [crate::data]).

mod fetch;
mod fetch_cancel;
mod fetch_error;
mod fetch_ok;
mod fetch_type;
mod filter_type;
mod go_away;
mod group_order;
mod max_request_id;
mod publish_namespace;
mod publish_namespace_cancel;
mod publish_namespace_done;
mod publish_namespace_error;
mod publish_namespace_ok;
mod publisher;
mod requests_blocked;
mod subscribe;
mod subscribe_done;
mod subscribe_done_code;
mod subscribe_error;
mod subscribe_namespace;
mod subscribe_namespace_error;
mod subscribe_namespace_ok;
mod subscribe_ok;
mod subscribe_update;
mod subscriber;
mod track_status;
mod track_status_code;
mod track_status_request;
mod unsubscribe;
mod unsubscribe_namespace;

pub use fetch::*;
pub use fetch_cancel::*;
pub use fetch_error::*;
pub use fetch_ok::*;
pub use fetch_type::*;
pub use filter_type::*;
pub use go_away::*;
pub use group_order::*;
pub use max_request_id::*;
pub use publish_namespace::*;
pub use publish_namespace_cancel::*;
pub use publish_namespace_done::*;
pub use publish_namespace_error::*;
pub use publish_namespace_ok::*;
pub use publisher::*;
pub use requests_blocked::*;
pub use subscribe::*;
pub use subscribe_done::*;
pub use subscribe_done_code::*;
pub use subscribe_error::*;
pub use subscribe_namespace::*;
pub use subscribe_namespace_error::*;
pub use subscribe_namespace_ok::*;
pub use subscribe_ok::*;
pub use subscribe_update::*;
pub use subscriber::*;
pub use track_status::*;
pub use track_status_code::*;
pub use track_status_request::*;
pub use unsubscribe::*;
pub use unsubscribe_namespace::*;

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use bytes::Buf;
use std::fmt;

// Generate the message union with a macro rather than copy-paste.
// Decode enforces the u16 length frame: the payload is parsed from an
// exact-length buffer, so a message can neither read past its frame nor
// leave unparsed bytes inside it.
macro_rules! message_types {
    {$($name:ident = $val:expr,)*} => {
		/// All supported control messages.
		#[derive(Clone)]
		pub enum Message {
			$($name($name)),*
		}

		impl Decode for Message {
			fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
				let t = u64::decode(r)?;
				let len = u16::decode(r)? as usize;

				// Refuse to parse until the entire frame has arrived.
				Self::decode_remaining(r, len)?;

				let mut payload = vec![0; len];
				r.copy_to_slice(&mut payload);
				let mut payload = bytes::Bytes::from(payload);

				let msg = match t {
					$($val => {
						// Running short inside an exact-length frame means the
						// declared length was wrong, not that more bytes help.
						let msg = $name::decode(&mut payload).map_err(|err| match err {
							DecodeError::More(_) => DecodeError::InvalidPayloadLength,
							err => err,
						})?;
						Self::$name(msg)
					})*
					_ => return Err(DecodeError::InvalidMessage(t)),
				};

				if payload.has_remaining() {
					return Err(DecodeError::InvalidPayloadLength);
				}

				Ok(msg)
			}
		}

		impl Encode for Message {
			fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
				match self {
					$(Self::$name(ref m) => {
						self.id().encode(w)?;

						// Encode the payload into a scratch buffer first; the
						// u16 length is not known until afterwards.
						let mut buf = Vec::new();
						m.encode(&mut buf)?;
						if buf.len() > u16::MAX as usize {
							return Err(EncodeError::MsgBoundsExceeded);
						}
						(buf.len() as u16).encode(w)?;

						Self::encode_remaining(w, buf.len())?;
						w.put_slice(&buf);
						Ok(())
					},)*
				}
			}
		}

		impl Message {
			pub fn id(&self) -> u64 {
				match self {
					$(Self::$name(_) => {
						$val
					},)*
				}
			}

			pub fn name(&self) -> &'static str {
				match self {
					$(Self::$name(_) => {
						stringify!($name)
					},)*
				}
			}
		}

		$(impl From<$name> for Message {
			fn from(m: $name) -> Self {
				Message::$name(m)
			}
		})*

		impl fmt::Debug for Message {
			// Delegate to the message formatter
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				match self {
					$(Self::$name(ref m) => m.fmt(f),)*
				}
			}
		}
    }
}

// Each message is prefixed with the given varint type code.
message_types! {
    // NOTE: CLIENT_SETUP (0x20) and SERVER_SETUP (0x21) are in the setup module.

    // SUBSCRIBE family, sent by subscriber
    SubscribeUpdate = 0x2,
    Subscribe = 0x3,
    Unsubscribe = 0xa,
    // SUBSCRIBE family, sent by publisher
    SubscribeOk = 0x4,
    SubscribeError = 0x5,
    SubscribeDone = 0xb,

    // PUBLISH_NAMESPACE family, sent by publisher
    PublishNamespace = 0x6,
    PublishNamespaceDone = 0x9,
    // PUBLISH_NAMESPACE family, sent by subscriber
    PublishNamespaceOk = 0x7,
    PublishNamespaceError = 0x8,
    PublishNamespaceCancel = 0xc,

    // TRACK_STATUS family, sent by subscriber
    TrackStatusRequest = 0xd,
    // TRACK_STATUS family, sent by publisher
    TrackStatus = 0xe,

    // Session maintenance
    GoAway = 0x10,
    MaxRequestId = 0x15,
    RequestsBlocked = 0x1a,

    // SUBSCRIBE_NAMESPACE family, sent by subscriber
    SubscribeNamespace = 0x11,
    UnsubscribeNamespace = 0x14,
    // SUBSCRIBE_NAMESPACE family, sent by publisher
    SubscribeNamespaceOk = 0x12,
    SubscribeNamespaceError = 0x13,

    // FETCH family, sent by subscriber
    Fetch = 0x16,
    FetchCancel = 0x17,
    // FETCH family, sent by publisher
    FetchOk = 0x18,
    FetchError = 0x19,
}
