use std::collections::VecDeque;
use std::time::Duration;

use crate::coding::{FullTrackName, Location};
use crate::data::MoqtObject;
use crate::message::GroupOrder;
use crate::watch::State;

use super::{Subscriber, TrackError};

/// The range a fetch asks for.
#[derive(Clone, Debug)]
pub enum FetchVariant {
    Standalone {
        full_track_name: FullTrackName,
        start: Location,
        end: Location,
    },
    /// Join an existing subscription some groups before its largest.
    Relative {
        joining_request_id: u64,
        joining_start: u64,
    },
    /// Join an existing subscription at an absolute group.
    Absolute {
        joining_request_id: u64,
        joining_start: u64,
    },
}

/// What FETCH_OK told us.
#[derive(Debug, Clone, Copy)]
pub struct FetchActive {
    pub group_order: GroupOrder,
    pub end_of_track: bool,
    pub end_location: Location,
}

struct FetchState {
    ok: Option<FetchActive>,
    /// In-order objects off the fetch stream, waiting to be pulled.
    objects: VecDeque<MoqtObject>,
    /// The stream finished; drain and report the end.
    finished: bool,
    closed: Result<(), TrackError>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            ok: None,
            objects: Default::default(),
            finished: false,
            closed: Ok(()),
        }
    }
}

/// A fetch held by the application: Pending until FETCH_OK, Streaming while
/// the bounded object sequence arrives, Ended at end-of-track or on
/// FETCH_ERROR / FETCH_CANCEL.
#[must_use = "cancel on drop"]
pub struct FetchRequest {
    state: State<FetchState>,
    subscriber: Subscriber,
    timeout: Duration,

    /// The fetch request ID.
    pub id: u64,
    /// The track name objects resolve against.
    pub full_track_name: FullTrackName,
}

impl FetchRequest {
    pub(super) fn new(
        subscriber: Subscriber,
        id: u64,
        full_track_name: FullTrackName,
        timeout: Duration,
    ) -> (FetchRequest, FetchRecv) {
        let (send, recv) = State::default().split();

        let fetch = FetchRequest {
            state: send,
            subscriber,
            timeout,
            id,
            full_track_name: full_track_name.clone(),
        };
        let recv = FetchRecv {
            state: recv,
            full_track_name,
        };

        (fetch, recv)
    }

    /// Wait for FETCH_OK, bounded by the request timeout. On expiry the
    /// fetch ends locally and a best-effort FETCH_CANCEL goes out.
    pub async fn active(&mut self) -> Result<FetchActive, TrackError> {
        let wait = async {
            loop {
                {
                    let state = self.state.lock();
                    if let Some(ok) = state.ok {
                        return Ok(ok);
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

    /// Pull the next fetched object, in the order the publisher sent them.
    /// `None` once the fetch stream has finished and everything was pulled.
    pub async fn next_object(&mut self) -> Option<MoqtObject> {
        loop {
            {
                let state = self.state.lock();
                if !state.objects.is_empty() {
                    return state.into_mut()?.objects.pop_front();
                }
                if state.finished || state.closed.is_err() {
                    return None;
                }

                state.modified()?
            }
            .await;
        }
    }

    /// Wait until the fetch ends; the error says why.
    pub async fn closed(&self) -> Result<(), TrackError> {
        loop {
            {
                let state = self.state.lock();
                state.closed.clone()?;
                if state.finished {
                    return Ok(());
                }

                match state.modified() {
                    Some(notify) => notify,
                    None => return Ok(()),
                }
            }
            .await;
        }
    }

    fn abandon(&mut self, err: TrackError) {
        let streaming = {
            let state = self.state.lock();
            let streaming = state.closed.is_ok() && !state.finished;
            if streaming {
                if let Some(mut state) = state.into_mut() {
                    state.closed = Err(err);
                }
            }
            streaming
        };

        // Only an in-flight fetch is worth a FETCH_CANCEL; either way the
        // session forgets about this request.
        self.subscriber.cancel_fetch(self.id, streaming);
    }
}

impl Drop for FetchRequest {
    fn drop(&mut self) {
        self.abandon(TrackError::Cancelled);
    }
}

/// The session's half of a fetch.
pub(super) struct FetchRecv {
    state: State<FetchState>,
    pub full_track_name: FullTrackName,
}

impl FetchRecv {
    pub fn recv_ok(&mut self, ok: FetchActive) -> Result<(), TrackError> {
        let mut state = self.state.lock_mut().ok_or(TrackError::Cancelled)?;
        if state.ok.is_some() {
            return Err(TrackError::Duplicate);
        }
        state.ok = Some(ok);
        Ok(())
    }

    /// A handle the fetch stream task feeds objects through.
    pub fn feeder(&self) -> FetchFeeder {
        FetchFeeder {
            state: self.state.clone(),
        }
    }

    pub fn close(self, err: TrackError) -> Result<(), TrackError> {
        let state = self.state.lock();
        state.closed.clone()?;

        let mut state = state.into_mut().ok_or(TrackError::Done)?;
        state.closed = Err(err);

        Ok(())
    }
}

/// Feeds decoded fetch objects into the application's pull queue.
#[derive(Clone)]
pub(super) struct FetchFeeder {
    state: State<FetchState>,
}

impl FetchFeeder {
    pub fn push(&mut self, object: MoqtObject) -> Result<(), TrackError> {
        let mut state = self.state.lock_mut().ok_or(TrackError::Cancelled)?;
        if state.finished || state.closed.is_err() {
            return Err(TrackError::Done);
        }
        state.objects.push_back(object);
        Ok(())
    }

    /// The stream finished cleanly; the application drains what is queued.
    pub fn finish(self) {
        if let Some(mut state) = self.state.lock_mut() {
            state.finished = true;
        }
    }
}
