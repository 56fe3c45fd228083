use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::playout;
use crate::util::{Clock, SystemClock};

/// Session configuration, passed at construction.
#[derive(Clone)]
pub struct Config {
    /// Request ID ceiling we advertise to the peer.
    pub max_requests: u64,

    /// How long an outbound request may wait for its response.
    pub request_timeout: Duration,

    /// How long the handshake (and any half-received control message) may
    /// take before the session terminates with CONTROL_MESSAGE_TIMEOUT.
    pub control_message_timeout: Duration,

    /// How long after an inbound GOAWAY we keep draining before closing.
    pub goaway_grace: Duration,

    /// How many early data streams may wait for their subscription to
    /// activate; more than this and new ones are dropped.
    pub staging_limit: usize,

    /// How long an early data stream may wait in staging.
    pub staging_timeout: Duration,

    /// Defaults for each subscription's playout buffer.
    pub playout: playout::Options,

    /// The clock used for playout ages and capture timestamps.
    pub clock: Arc<dyn Clock>,

    /// Write a qlog-style transport event log here, if set.
    pub mlog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_requests: 256,
            request_timeout: Duration::from_secs(10),
            control_message_timeout: Duration::from_secs(10),
            goaway_grace: Duration::from_secs(5),
            staging_limit: 16,
            staging_timeout: Duration::from_secs(2),
            playout: Default::default(),
            clock: Arc::new(SystemClock),
            mlog_path: None,
        }
    }
}
