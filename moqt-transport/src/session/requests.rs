use crate::message::{self, Message};
use crate::watch::{Queue, State};

use super::{SessionError, TrackError};

/// Which side of the connection we are; decides request ID parity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// Opened the connection; uses even request IDs.
    Client,
    /// Accepted the connection; uses odd request IDs.
    Server,
}

struct RequestState {
    /// Next outbound ID; advances by 2, never rewinds.
    next: u64,
    /// The peer's advertised ceiling; outbound IDs stay strictly below it.
    peer_max: u64,
    /// Whether we already told the peer we are blocked on peer_max.
    blocked_sent: bool,

    /// Next inbound ID we expect from the peer.
    expect: u64,
    /// The ceiling we advertised; raised as the peer consumes IDs.
    local_max: u64,
}

/// Allocates outbound request IDs against the peer's credit and validates
/// inbound ones against ours.
///
/// One instance is shared by every requester in the session; only the
/// session task mutates it, other tasks go through these methods.
#[derive(Clone)]
pub struct Requests {
    state: State<RequestState>,
    outgoing: Queue<Message>,
    window: u64,
}

impl Requests {
    pub fn new(role: Role, peer_max: u64, local_max: u64, outgoing: Queue<Message>) -> Self {
        let (next, expect) = match role {
            Role::Client => (0, 1),
            Role::Server => (1, 0),
        };

        Self {
            state: State::new(RequestState {
                next,
                peer_max,
                blocked_sent: false,
                expect,
                local_max,
            }),
            outgoing,
            window: local_max,
        }
    }

    /// Take the next outbound request ID, waiting for MAX_REQUEST_ID credit
    /// if the peer's ceiling is exhausted. The first wait announces the
    /// stall with REQUESTS_BLOCKED.
    pub async fn allocate(&mut self) -> Result<u64, TrackError> {
        loop {
            {
                let state = self.state.lock();
                if state.next < state.peer_max {
                    let mut state = state.into_mut().ok_or(TrackError::Cancelled)?;
                    let id = state.next;
                    state.next += 2;
                    return Ok(id);
                }

                if !state.blocked_sent {
                    let max = state.peer_max;
                    let mut state = state.into_mut().ok_or(TrackError::Cancelled)?;
                    state.blocked_sent = true;
                    drop(state);

                    log::debug!("request ids exhausted, sending REQUESTS_BLOCKED({})", max);
                    let _ = self.outgoing.push(
                        message::RequestsBlocked {
                            max_request_id: max,
                        }
                        .into(),
                    );
                    continue;
                }

                match state.modified() {
                    Some(notify) => notify,
                    None => return Err(TrackError::Cancelled),
                }
            }
            .await;
        }
    }

    /// Take the next outbound ID without waiting.
    pub fn try_allocate(&mut self) -> Result<u64, TrackError> {
        let state = self.state.lock();
        if state.next >= state.peer_max {
            return Err(TrackError::TooManyRequests);
        }
        let mut state = state.into_mut().ok_or(TrackError::Cancelled)?;
        let id = state.next;
        state.next += 2;
        Ok(id)
    }

    /// Handle an inbound MAX_REQUEST_ID. Ceilings only ever rise.
    pub fn set_peer_max(&mut self, max: u64) -> Result<(), SessionError> {
        let mut state = self.state.lock_mut().ok_or(SessionError::Internal)?;
        if max < state.peer_max {
            return Err(SessionError::Decode(
                crate::coding::DecodeError::InvalidValue,
            ));
        }
        if max > state.peer_max {
            state.peer_max = max;
            state.blocked_sent = false;
        }
        Ok(())
    }

    /// Validate an inbound request ID: correct parity, never reused, never
    /// rewound, within the ceiling we advertised. Advances the expectation
    /// and tops the peer's credit back up when half the window is consumed.
    pub fn validate_inbound(&mut self, id: u64) -> Result<(), SessionError> {
        let raise = {
            let mut state = self.state.lock_mut().ok_or(SessionError::Internal)?;

            if id % 2 != state.expect % 2 || id < state.expect {
                return Err(SessionError::InvalidRequestId(id));
            }
            if id >= state.local_max {
                return Err(SessionError::TooManyRequests);
            }

            state.expect = id + 2;

            // Top up before the peer actually stalls.
            if state.local_max.saturating_sub(state.expect) < self.window / 2 {
                state.local_max += self.window;
                Some(state.local_max)
            } else {
                None
            }
        };

        if let Some(max) = raise {
            log::debug!("raising peer request id ceiling to {}", max);
            let _ = self
                .outgoing
                .push(message::MaxRequestId { request_id: max }.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests(peer_max: u64) -> (Requests, Queue<Message>) {
        let (tx, rx) = Queue::default().split();
        (Requests::new(Role::Client, peer_max, 64, tx), rx)
    }

    #[test]
    fn ids_increase_monotonically() {
        let (mut requests, _rx) = requests(64);

        let a = requests.try_allocate().unwrap();
        let b = requests.try_allocate().unwrap();
        let c = requests.try_allocate().unwrap();
        assert_eq!((a, b, c), (0, 2, 4));
    }

    #[test]
    fn exhaustion_without_blocking() {
        let (mut requests, _rx) = requests(4);

        requests.try_allocate().unwrap();
        requests.try_allocate().unwrap();
        let exhausted = requests.try_allocate();
        assert_eq!(exhausted.unwrap_err(), TrackError::TooManyRequests);
    }

    #[tokio::test]
    async fn blocked_until_ceiling_rises() {
        let (mut requests, mut rx) = requests(2);

        assert_eq!(requests.allocate().await.unwrap(), 0);

        // The next allocation stalls and announces REQUESTS_BLOCKED.
        let mut blocked = requests.clone();
        let task = tokio::spawn(async move { blocked.allocate().await });

        match rx.pop().await.unwrap() {
            Message::RequestsBlocked(msg) => assert_eq!(msg.max_request_id, 2),
            other => panic!("unexpected message: {:?}", other),
        }

        requests.set_peer_max(8).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }

    #[test]
    fn peer_max_never_rewinds() {
        let (mut requests, _rx) = requests(8);
        requests.set_peer_max(16).unwrap();
        assert!(requests.set_peer_max(8).is_err());
    }

    #[test]
    fn inbound_validation() {
        let (mut requests, _rx) = requests(64);

        // Server-initiated ids are odd for a client session.
        requests.validate_inbound(1).unwrap();
        requests.validate_inbound(3).unwrap();

        // Reuse, rewind and bad parity all terminate.
        assert!(matches!(
            requests.validate_inbound(3).unwrap_err(),
            SessionError::InvalidRequestId(3)
        ));
        assert!(matches!(
            requests.validate_inbound(1).unwrap_err(),
            SessionError::InvalidRequestId(1)
        ));
        assert!(matches!(
            requests.validate_inbound(6).unwrap_err(),
            SessionError::InvalidRequestId(6)
        ));

        // Gaps are allowed; skipped ids are implicitly consumed.
        requests.validate_inbound(9).unwrap();
    }

    #[tokio::test]
    async fn inbound_window_raises_ceiling() {
        let (mut requests, mut rx) = requests(64);

        // Consume inbound ids until less than half the window remains.
        let mut id = 1;
        while id <= 33 {
            requests.validate_inbound(id).unwrap();
            id += 2;
        }

        match rx.pop().await.unwrap() {
            Message::MaxRequestId(msg) => assert_eq!(msg.request_id, 128),
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
