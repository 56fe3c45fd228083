use crate::{coding, setup};

/// Session termination codes sent in the CONNECTION_CLOSE when a session
/// ends, from the draft-11 registry.
pub mod termination {
    pub const NO_ERROR: u64 = 0x0;
    pub const INTERNAL_ERROR: u64 = 0x1;
    pub const UNAUTHORIZED: u64 = 0x2;
    pub const PROTOCOL_VIOLATION: u64 = 0x3;
    pub const INVALID_REQUEST_ID: u64 = 0x4;
    pub const DUPLICATE_TRACK_ALIAS: u64 = 0x5;
    pub const KEY_VALUE_FORMATTING_ERROR: u64 = 0x6;
    pub const TOO_MANY_REQUESTS: u64 = 0x7;
    pub const GOAWAY_TIMEOUT: u64 = 0x10;
    pub const CONTROL_MESSAGE_TIMEOUT: u64 = 0x11;
    pub const DATA_STREAM_TIMEOUT: u64 = 0x12;
    pub const VERSION_NEGOTIATION_FAILED: u64 = 0x15;
}

/// A fatal session error; the whole connection terminates with [code](SessionError::code).
#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    #[error("webtransport session: {0}")]
    Session(#[from] web_transport::SessionError),

    #[error("webtransport write: {0}")]
    Write(#[from] web_transport::WriteError),

    #[error("webtransport read: {0}")]
    Read(#[from] web_transport::ReadError),

    #[error("encode error: {0}")]
    Encode(#[from] coding::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] coding::DecodeError),

    #[error("unsupported versions: client={0:?} server={1:?}")]
    Version(setup::Versions, setup::Versions),

    /// A request ID was reused, rewound, or had the wrong parity.
    #[error("invalid request id: {0}")]
    InvalidRequestId(u64),

    /// A track alias was bound twice.
    #[error("duplicate track alias: {0}")]
    DuplicateTrackAlias(u64),

    /// The peer exceeded the request ID ceiling we advertised.
    #[error("too many requests")]
    TooManyRequests,

    #[error("control message timeout")]
    ControlMessageTimeout,

    #[error("data stream timeout")]
    DataStreamTimeout,

    /// The GOAWAY grace period expired before the peer closed.
    #[error("goaway timeout")]
    GoAwayTimeout,

    /// Some varint was out of range for its target.
    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] coding::BoundsExceeded),

    /// A request-scoped failure escalated by the caller.
    #[error("track error: {0}")]
    Track(#[from] TrackError),

    #[error("internal error")]
    Internal,
}

impl SessionError {
    /// The termination code sent over the wire for this error.
    pub fn code(&self) -> u64 {
        match self {
            Self::Session(_) | Self::Read(_) | Self::Write(_) => termination::INTERNAL_ERROR,
            Self::Encode(_) | Self::BoundsExceeded(_) | Self::Internal => {
                termination::INTERNAL_ERROR
            }
            Self::Decode(coding::DecodeError::KeyValueFormat) => {
                termination::KEY_VALUE_FORMATTING_ERROR
            }
            Self::Decode(_) => termination::PROTOCOL_VIOLATION,
            Self::Version(..) => termination::VERSION_NEGOTIATION_FAILED,
            Self::InvalidRequestId(_) => termination::INVALID_REQUEST_ID,
            Self::DuplicateTrackAlias(_) => termination::DUPLICATE_TRACK_ALIAS,
            Self::TooManyRequests => termination::TOO_MANY_REQUESTS,
            Self::ControlMessageTimeout => termination::CONTROL_MESSAGE_TIMEOUT,
            Self::DataStreamTimeout => termination::DATA_STREAM_TIMEOUT,
            Self::GoAwayTimeout => termination::GOAWAY_TIMEOUT,
            Self::Track(TrackError::Unauthorized) => termination::UNAUTHORIZED,
            Self::Track(_) => termination::INTERNAL_ERROR,
        }
    }
}

/// A request-scoped error: one subscription, fetch, announcement or status
/// request failed, the session carries on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Ended normally (unsubscribe, SUBSCRIBE_DONE, drained).
    #[error("done")]
    Done,

    /// Cancelled locally before completion.
    #[error("cancelled")]
    Cancelled,

    /// The peer rejected or ended the request with this code.
    #[error("closed, code={0}")]
    Closed(u64),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("duplicate")]
    Duplicate,

    /// No response arrived within the request timeout.
    #[error("timed out")]
    Timeout,

    /// Request ID credit was exhausted and blocking was not allowed.
    #[error("too many requests")]
    TooManyRequests,

    /// The session is draining after a GOAWAY; no new requests.
    #[error("going away")]
    GoingAway,

    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackError {
    /// The phrase accompanying [TrackError::code] in error responses.
    pub fn reason_phrase(&self) -> crate::coding::ReasonPhrase {
        crate::coding::ReasonPhrase(self.to_string())
    }

    /// The error code used when this failure is reported in a response
    /// message (SUBSCRIBE_ERROR, FETCH_ERROR, PUBLISH_NAMESPACE_ERROR, ...).
    pub fn code(&self) -> u64 {
        match self {
            Self::Done => 0x0,
            Self::Internal(_) => 0x0,
            Self::Unauthorized => 0x1,
            Self::Timeout => 0x2,
            Self::Cancelled | Self::GoingAway => 0x3,
            Self::NotFound => 0x4,
            Self::Duplicate => 0x5,
            Self::TooManyRequests => 0x7,
            Self::Closed(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_codes() {
        assert_eq!(SessionError::InvalidRequestId(4).code(), 0x4);
        assert_eq!(SessionError::DuplicateTrackAlias(9).code(), 0x5);
        assert_eq!(
            SessionError::Decode(coding::DecodeError::KeyValueFormat).code(),
            0x6
        );
        assert_eq!(
            SessionError::Decode(coding::DecodeError::InvalidValue).code(),
            0x3
        );
        assert_eq!(SessionError::TooManyRequests.code(), 0x7);
        assert_eq!(SessionError::GoAwayTimeout.code(), 0x10);
        assert_eq!(SessionError::ControlMessageTimeout.code(), 0x11);

        let offered = [setup::Version::DRAFT_11].into();
        let selected = [setup::Version(0xff00000c)].into();
        assert_eq!(SessionError::Version(offered, selected).code(), 0x15);
    }
}
