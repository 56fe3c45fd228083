use std::time::Duration;

use crate::coding::Tuple;
use crate::watch::{Queue, State};

use super::{Announced, Subscriber, TrackError};

#[derive(Debug, Clone)]
pub struct NamespaceInfo {
    /// The namespace subscription request ID.
    pub id: u64,
    pub prefix: Tuple,
}

struct NamespaceState {
    active: bool,
    closed: Result<(), TrackError>,
}

impl Default for NamespaceState {
    fn default() -> Self {
        Self {
            active: false,
            closed: Ok(()),
        }
    }
}

/// A subscription to announcements under a namespace prefix: Pending until
/// SUBSCRIBE_NAMESPACE_OK, Active while announcements arrive, Ended on
/// error or drop (which sends UNSUBSCRIBE_NAMESPACE).
#[must_use = "unsubscribed on drop"]
pub struct NamespaceSubscription {
    state: State<NamespaceState>,
    subscriber: Subscriber,
    announced: Queue<Announced>,
    timeout: Duration,

    pub info: NamespaceInfo,
}

impl NamespaceSubscription {
    pub(super) fn new(
        subscriber: Subscriber,
        id: u64,
        prefix: Tuple,
        timeout: Duration,
    ) -> (NamespaceSubscription, NamespaceRecv) {
        let info = NamespaceInfo {
            id,
            prefix: prefix.clone(),
        };

        let (send, recv) = State::default().split();
        let announced = Queue::default().split();

        let subscription = Self {
            state: send,
            subscriber,
            announced: announced.1,
            timeout,
            info,
        };
        let recv = NamespaceRecv {
            state: recv,
            announced: announced.0,
            prefix,
        };

        (subscription, recv)
    }

    /// Wait for SUBSCRIBE_NAMESPACE_OK, bounded by the request timeout.
    pub async fn active(&mut self) -> Result<(), TrackError> {
        let wait = async {
            loop {
                {
                    let state = self.state.lock();
                    if state.active {
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
                self.abandon();
                Err(TrackError::Timeout)
            }
        }
    }

    /// The next announcement under the subscribed prefix; `None` once the
    /// subscription has ended.
    pub async fn next_announced(&mut self) -> Option<Announced> {
        self.announced.pop().await
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

    fn abandon(&mut self) {
        {
            let state = self.state.lock();
            if state.closed.is_err() {
                return;
            }
            if let Some(mut state) = state.into_mut() {
                state.closed = Err(TrackError::Cancelled);
            }
        }

        self.subscriber
            .unsubscribe_namespace(self.info.id, self.info.prefix.clone());
    }
}

impl Drop for NamespaceSubscription {
    fn drop(&mut self) {
        self.abandon();
    }
}

/// The session's half of a namespace subscription.
pub(super) struct NamespaceRecv {
    state: State<NamespaceState>,
    announced: Queue<Announced>,
    pub prefix: Tuple,
}

impl NamespaceRecv {
    pub fn recv_ok(&mut self) -> Result<(), TrackError> {
        let mut state = self.state.lock_mut().ok_or(TrackError::Cancelled)?;
        if state.active {
            return Err(TrackError::Duplicate);
        }
        state.active = true;
        Ok(())
    }

    /// Route an announcement whose namespace starts with this prefix.
    pub fn deliver(&mut self, announced: Announced) -> Result<(), Announced> {
        self.announced.push(announced)
    }

    pub fn close(self, err: TrackError) -> Result<(), TrackError> {
        let state = self.state.lock();
        state.closed.clone()?;

        let mut state = state.into_mut().ok_or(TrackError::Done)?;
        state.closed = Err(err);

        Ok(())
    }
}
