use std::ops;

use crate::message;
use crate::watch::State;

use super::{AnnounceInfo, Subscriber, TrackError};

// There is no feedback from the peer after the OK/Error reply, so the
// shared state only tracks liveness.
#[derive(Default)]
struct AnnouncedState {}

/// An inbound namespace announcement from the publisher.
///
/// The application accepts with [Announced::ok] or rejects by dropping it
/// (or calling [Announced::close] with a reason). An accepted announcement
/// ends when the publisher withdraws it or this handle drops, which sends
/// PUBLISH_NAMESPACE_CANCEL.
pub struct Announced {
    subscriber: Subscriber,
    state: State<AnnouncedState>,

    pub info: AnnounceInfo,

    ok: bool,
    error: Option<TrackError>,
}

impl Announced {
    pub(super) fn new(subscriber: Subscriber, id: u64, namespace: crate::coding::Tuple) -> (Announced, AnnouncedRecv) {
        let info = AnnounceInfo { id, namespace };

        let (send, recv) = State::default().split();
        let send = Self {
            subscriber,
            state: send,
            info,
            ok: false,
            error: None,
        };
        let recv = AnnouncedRecv { _state: recv };

        (send, recv)
    }

    /// Accept the announcement with PUBLISH_NAMESPACE_OK.
    pub fn ok(&mut self) -> Result<(), TrackError> {
        if self.ok {
            return Err(TrackError::Duplicate);
        }

        self.subscriber
            .send_message(message::PublishNamespaceOk { id: self.info.id });

        self.ok = true;

        Ok(())
    }

    /// Wait until the publisher withdraws the announcement.
    pub async fn closed(&self) -> Result<(), TrackError> {
        loop {
            // Loop until the state can no longer change: the recv half was
            // dropped, meaning PUBLISH_NAMESPACE_DONE arrived.
            match self.state.lock().modified() {
                Some(notify) => notify.await,
                None => return Ok(()),
            }
        }
    }

    /// Reject or revoke with a specific reason; otherwise dropping sends a
    /// generic one.
    pub fn close(mut self, err: TrackError) {
        self.error = Some(err);
    }
}

impl ops::Deref for Announced {
    type Target = AnnounceInfo;

    fn deref(&self) -> &AnnounceInfo {
        &self.info
    }
}

impl Drop for Announced {
    fn drop(&mut self) {
        let err = self.error.clone().unwrap_or(TrackError::Done);

        if self.ok {
            self.subscriber
                .send_message(message::PublishNamespaceCancel {
                    namespace: self.info.namespace.clone(),
                    error_code: err.code(),
                    reason_phrase: err.reason_phrase(),
                });
        } else {
            self.subscriber.send_message(message::PublishNamespaceError {
                id: self.info.id,
                error_code: err.code(),
                reason_phrase: err.reason_phrase(),
            });
        }

        self.subscriber.drop_announced(&self.info.namespace);
    }
}

/// The session's half of an inbound announcement; dropping it wakes
/// [Announced::closed].
pub(super) struct AnnouncedRecv {
    _state: State<AnnouncedState>,
}

impl AnnouncedRecv {
    pub fn recv_done(self) -> Result<(), TrackError> {
        // Dropping the state half is the notification.
        Ok(())
    }
}
