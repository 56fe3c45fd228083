use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::coding::{FullTrackName, KeyValuePairs, Location};
use crate::data::MoqtObject;
use crate::message::{self, GroupOrder};
use crate::playout::{self, PlayoutCloser, PlayoutReader, PlayoutWriter};
use crate::watch::State;

use super::{Subscriber, TrackError};

/// Which objects a subscription asks for.
#[derive(Clone, Debug, Default)]
pub enum Filter {
    /// Start at the first object of the next group.
    NextGroupStart,
    /// Start at the largest object the publisher has seen.
    #[default]
    LatestObject,
    AbsoluteStart(Location),
    /// Start location and inclusive end group; the end group must not
    /// precede the start group.
    AbsoluteRange(Location, u64),
}

/// Options for [Subscriber::subscribe].
#[derive(Clone, Debug)]
pub struct SubscribeOptions {
    pub filter: Filter,
    /// Smaller values are delivered first.
    pub priority: u8,
    pub group_order: GroupOrder,
    /// Whether the publisher should forward objects at all.
    pub forward: bool,
    pub params: KeyValuePairs,
    /// Playout tuning for this subscription; the session default otherwise.
    pub playout: Option<playout::Options>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            filter: Default::default(),
            priority: 127,
            group_order: GroupOrder::Original,
            forward: true,
            params: Default::default(),
            playout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    /// The request ID the subscription was issued with. An alias retry
    /// reissues under a fresh ID; see [SubscriptionState].
    pub id: u64,
    pub track_alias: u64,
    pub full_track_name: FullTrackName,
}

/// What SUBSCRIBE_OK told us.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionActive {
    pub expires: u64,
    pub group_order: GroupOrder,
    pub largest_location: Option<Location>,
}

pub(super) struct SubscriptionState {
    /// The live request ID; changes when an alias retry reissues.
    pub id: u64,
    pub active: Option<SubscriptionActive>,
    pub closed: Result<(), TrackError>,
}

/// A subscription held by the application: Pending until SUBSCRIBE_OK,
/// Active while objects flow, Ended on SUBSCRIBE_DONE / UNSUBSCRIBE /
/// SUBSCRIBE_ERROR / session close.
///
/// Buffered objects stay consumable after the subscription ends; once
/// drained, [Subscription::next_object] reports the end of the stream.
#[must_use = "unsubscribe on drop"]
pub struct Subscription {
    state: State<SubscriptionState>,
    subscriber: Subscriber,
    reader: PlayoutReader,
    timeout: Duration,

    pub info: SubscriptionInfo,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("timeout", &self.timeout)
            .field("info", &self.info)
            .finish()
    }
}

impl Subscription {
    pub(super) fn new(
        subscriber: Subscriber,
        msg: message::Subscribe,
        timeout: Duration,
        playout: (PlayoutWriter, PlayoutReader),
    ) -> (Subscription, SubscriptionRecv) {
        let info = SubscriptionInfo {
            id: msg.id,
            track_alias: msg.track_alias,
            full_track_name: msg.full_track_name.clone(),
        };

        let (send, recv) = State::new(SubscriptionState {
            id: msg.id,
            active: None,
            closed: Ok(()),
        })
        .split();

        let subscription = Subscription {
            state: send,
            subscriber,
            reader: playout.1,
            timeout,
            info,
        };

        let closer = playout.0.closer();
        let recv = SubscriptionRecv {
            state: recv,
            playout: Arc::new(Mutex::new(playout.0)),
            closer,
            msg,
            retries: 0,
        };

        (subscription, recv)
    }

    /// Wait for SUBSCRIBE_OK, bounded by the request timeout. On expiry the
    /// subscription ends locally with [TrackError::Timeout] and a
    /// best-effort UNSUBSCRIBE goes out.
    pub async fn active(&mut self) -> Result<SubscriptionActive, TrackError> {
        let wait = async {
            loop {
                {
                    let state = self.state.lock();
                    if let Some(active) = state.active {
                        return Ok(active);
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
                self.abandon(TrackError::Timeout);
                Err(TrackError::Timeout)
            }
        }
    }

    /// Pull the next object in location order; `None` once the subscription
    /// has ended and the playout buffer is drained.
    pub async fn next_object(&mut self) -> Option<MoqtObject> {
        self.reader.next_object().await
    }

    /// Non-blocking probe for buffered objects.
    pub fn has_object_ready(&self) -> bool {
        self.reader.has_object_ready()
    }

    /// Wait until the subscription ends; the error says why.
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

    fn abandon(&mut self, err: TrackError) {
        let id = {
            let state = self.state.lock();
            if state.closed.is_err() {
                return;
            }
            let id = state.id;
            if let Some(mut state) = state.into_mut() {
                state.closed = Err(err);
            }
            id
        };

        self.subscriber.unsubscribe(id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abandon(TrackError::Cancelled);
    }
}

/// The session's half of a subscription.
pub(super) struct SubscriptionRecv {
    state: State<SubscriptionState>,
    playout: Arc<Mutex<PlayoutWriter>>,
    closer: PlayoutCloser,

    /// The SUBSCRIBE as sent, for alias-retry reissue.
    pub msg: message::Subscribe,
    pub retries: u8,
}

impl SubscriptionRecv {
    /// The producer half of the playout buffer, shared with stream tasks.
    pub fn playout(&self) -> Arc<Mutex<PlayoutWriter>> {
        self.playout.clone()
    }

    pub fn track_alias(&self) -> u64 {
        self.msg.track_alias
    }

    pub fn recv_ok(&mut self, msg: &message::SubscribeOk) -> Result<(), TrackError> {
        let mut state = self.state.lock_mut().ok_or(TrackError::Cancelled)?;
        if state.active.is_some() {
            return Err(TrackError::Duplicate);
        }

        state.active = Some(SubscriptionActive {
            expires: msg.expires,
            group_order: msg.group_order,
            largest_location: msg.largest_location,
        });

        Ok(())
    }

    /// End the subscription; the playout buffer closes and drains.
    pub fn close(self, err: TrackError) -> Result<(), TrackError> {
        self.closer.close();

        let state = self.state.lock();
        state.closed.clone()?;

        let mut state = state.into_mut().ok_or(TrackError::Done)?;
        state.closed = Err(err);

        Ok(())
    }

    /// Rewrite the request for an alias retry; the caller re-registers it
    /// under the fresh ID.
    pub fn reissue(&mut self, id: u64, track_alias: u64) -> message::Subscribe {
        self.retries += 1;
        self.msg.id = id;
        self.msg.track_alias = track_alias;

        if let Some(mut state) = self.state.lock_mut() {
            state.id = id;
        }

        self.msg.clone()
    }
}
