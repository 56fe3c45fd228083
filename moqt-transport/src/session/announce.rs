use std::time::Duration;

use crate::coding::Tuple;
use crate::message;
use crate::watch::State;

use super::{Publisher, TrackError};

#[derive(Debug, Clone)]
pub struct AnnounceInfo {
    /// The announcement request ID.
    pub id: u64,
    pub namespace: Tuple,
}

struct AnnounceState {
    acknowledged: bool,
    closed: Result<(), TrackError>,
}

impl Default for AnnounceState {
    fn default() -> Self {
        Self {
            acknowledged: false,
            closed: Ok(()),
        }
    }
}

/// An outgoing namespace announcement: Offered until PUBLISH_NAMESPACE_OK,
/// Acknowledged while it stands, Withdrawn on error, cancel or drop.
#[must_use = "withdrawn on drop"]
pub struct Announce {
    publisher: Publisher,
    state: State<AnnounceState>,
    timeout: Duration,

    pub info: AnnounceInfo,
}

impl Announce {
    pub(super) fn new(
        mut publisher: Publisher,
        id: u64,
        namespace: Tuple,
        params: crate::coding::KeyValuePairs,
        timeout: Duration,
    ) -> (Announce, AnnounceRecv) {
        let info = AnnounceInfo {
            id,
            namespace: namespace.clone(),
        };

        publisher.send_message(message::PublishNamespace {
            id,
            namespace,
            params,
        });

        let (send, recv) = State::default().split();

        let announce = Self {
            publisher,
            state: send,
            timeout,
            info,
        };
        let recv = AnnounceRecv { state: recv };

        (announce, recv)
    }

    /// Wait for PUBLISH_NAMESPACE_OK, bounded by the request timeout.
    pub async fn acknowledged(&mut self) -> Result<(), TrackError> {
        let wait = async {
            loop {
                {
                    let state = self.state.lock();
                    if state.acknowledged {
                        return Ok(());
                    }
                    state.closed.clone()?;

                    match state.modified() {
                        Some(notify) => notify,
                        None => return Err(TrackError::Cancelled),
                    }
                }
                .await;
            }
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(res) => res,
            Err(_) => {
                self.withdraw();
                Err(TrackError::Timeout)
            }
        }
    }

    /// Wait until the announcement ends; the error says why.
    pub async fn closed(&self) -> Result<(), TrackError> {
        loop {
            {
                let state = self.state.lock();
                state.closed.clone()?;

                match state.modified() {
                    Some(notify) => notify,
                    None => return Ok(()),
                }
            }
            .await;
        }
    }

    fn withdraw(&mut self) {
        {
            let state = self.state.lock();
            if state.closed.is_err() {
                return;
            }
            if let Some(mut state) = state.into_mut() {
                state.closed = Err(TrackError::Cancelled);
            }
        }

        self.publisher.send_message(message::PublishNamespaceDone {
            namespace: self.info.namespace.clone(),
        });
        self.publisher.drop_announce(self.info.id);
    }
}

impl Drop for Announce {
    fn drop(&mut self) {
        self.withdraw();
    }
}

/// The session's half of an announcement.
pub(super) struct AnnounceRecv {
    state: State<AnnounceState>,
}

impl AnnounceRecv {
    pub fn recv_ok(&mut self) -> Result<(), TrackError> {
        let mut state = self.state.lock_mut().ok_or(TrackError::Cancelled)?;
        if state.acknowledged {
            return Err(TrackError::Duplicate);
        }
        state.acknowledged = true;
        Ok(())
    }

    pub fn close(self, err: TrackError) -> Result<(), TrackError> {
        let state = self.state.lock();
        state.closed.clone()?;

        let mut state = state.into_mut().ok_or(TrackError::Done)?;
        state.closed = Err(err);

        Ok(())
    }
}

/// An inbound TRACK_STATUS_REQUEST waiting for the application's answer.
///
/// Unanswered requests report a missing track on drop.
pub struct TrackStatusRequested {
    publisher: Publisher,
    responded: bool,

    pub msg: message::TrackStatusRequest,
}

impl TrackStatusRequested {
    pub(super) fn new(publisher: Publisher, msg: message::TrackStatusRequest) -> Self {
        Self {
            publisher,
            responded: false,
            msg,
        }
    }

    pub fn respond(
        mut self,
        status_code: message::TrackStatusCode,
        largest_location: crate::coding::Location,
    ) {
        self.responded = true;
        self.publisher.send_message(message::TrackStatus {
            id: self.msg.id,
            status_code,
            largest_location,
            params: Default::default(),
        });
    }
}

impl Drop for TrackStatusRequested {
    fn drop(&mut self) {
        if self.responded {
            return;
        }

        self.publisher.send_message(message::TrackStatus {
            id: self.msg.id,
            status_code: message::TrackStatusCode::DoesNotExist,
            largest_location: Default::default(),
            params: Default::default(),
        });
    }
}
