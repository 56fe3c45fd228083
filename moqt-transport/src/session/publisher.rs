use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::coding::{FullTrackName, KeyValuePairs, Tuple};
use crate::message::{self, Message};
use crate::util::SessionStats;
use crate::watch::{Queue, State};

use super::{
    Announce, AnnounceRecv, Config, Phase, Requests, SessionError, Subscribed, TrackError,
    TrackStatusRequested, TrackWriter,
};

/// The publisher role: announces namespaces, opens track writers and
/// answers inbound subscribes and status requests.
#[derive(Clone)]
pub struct Publisher {
    webtransport: web_transport::Session,

    /// Outgoing announcements, keyed by request ID.
    announces: Arc<Mutex<HashMap<u64, AnnounceRecv>>>,
    /// Namespace to announcement request ID, for CANCEL routing.
    announce_ids: Arc<Mutex<HashMap<Tuple, u64>>>,

    /// Inbound subscribes waiting for the application.
    subscribed_queue: Queue<Subscribed>,
    /// Inbound status requests waiting for the application.
    status_queue: Queue<TrackStatusRequested>,

    /// Accepted inbound subscribes: request ID to track alias.
    subscribed: Arc<Mutex<HashMap<u64, u64>>>,

    outgoing: Queue<Message>,
    requests: Requests,
    phase: State<Phase>,
    config: Config,
    stats: Arc<SessionStats>,
}

impl Publisher {
    pub(super) fn new(
        webtransport: web_transport::Session,
        outgoing: Queue<Message>,
        requests: Requests,
        phase: State<Phase>,
        config: Config,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            webtransport,
            announces: Default::default(),
            announce_ids: Default::default(),
            subscribed_queue: Default::default(),
            status_queue: Default::default(),
            subscribed: Default::default(),
            outgoing,
            requests,
            phase,
            config,
            stats,
        }
    }

    fn ensure_established(&self) -> Result<(), TrackError> {
        match *self.phase.lock() {
            Phase::Established => Ok(()),
            Phase::Draining => Err(TrackError::GoingAway),
            _ => Err(TrackError::Cancelled),
        }
    }

    /// Announce a namespace. Suspends when request ID credit is exhausted,
    /// until the peer raises the ceiling.
    pub async fn announce_namespace(
        &mut self,
        namespace: Tuple,
        params: KeyValuePairs,
    ) -> Result<Announce, TrackError> {
        self.ensure_established()?;

        if self.announce_ids.lock().unwrap().contains_key(&namespace) {
            return Err(TrackError::Duplicate);
        }

        let id = self.requests.allocate().await?;

        let (announce, recv) = Announce::new(
            self.clone(),
            id,
            namespace.clone(),
            params,
            self.config.request_timeout,
        );

        self.announces.lock().unwrap().insert(id, recv);
        self.announce_ids.lock().unwrap().insert(namespace, id);

        Ok(announce)
    }

    /// Open a writer for a track whose alias was agreed out of band, e.g.
    /// through room signaling.
    pub fn open_track(&mut self, full_track_name: FullTrackName, track_alias: u64) -> TrackWriter {
        TrackWriter::new(self.clone(), full_track_name, track_alias, None)
    }

    /// The next inbound SUBSCRIBE waiting to be served or rejected.
    pub async fn subscribed(&mut self) -> Option<Subscribed> {
        self.subscribed_queue.pop().await
    }

    /// The next inbound TRACK_STATUS_REQUEST waiting for an answer.
    pub async fn track_status_requested(&mut self) -> Option<TrackStatusRequested> {
        self.status_queue.pop().await
    }

    pub(super) fn send_message<M: Into<Message>>(&mut self, msg: M) {
        let _ = self.outgoing.push(msg.into());
    }

    pub(super) fn drop_announce(&mut self, id: u64) {
        if self.announces.lock().unwrap().remove(&id).is_some() {
            self.announce_ids.lock().unwrap().retain(|_, v| *v != id);
        }
    }

    pub(super) fn register_subscribed(&mut self, id: u64, track_alias: u64) {
        self.subscribed.lock().unwrap().insert(id, track_alias);
    }

    pub(super) fn drop_subscribed(&mut self, id: u64) {
        self.subscribed.lock().unwrap().remove(&id);
    }

    /// Handle a control message sent by the subscriber role of the peer.
    pub(super) fn recv_message(&mut self, msg: message::Subscriber) -> Result<(), SessionError> {
        match msg {
            message::Subscriber::Subscribe(msg) => self.recv_subscribe(msg),
            message::Subscriber::SubscribeUpdate(msg) => self.recv_subscribe_update(msg),
            message::Subscriber::Unsubscribe(msg) => self.recv_unsubscribe(msg),
            message::Subscriber::PublishNamespaceOk(msg) => self.recv_publish_namespace_ok(msg),
            message::Subscriber::PublishNamespaceError(msg) => {
                self.recv_publish_namespace_error(msg)
            }
            message::Subscriber::PublishNamespaceCancel(msg) => {
                self.recv_publish_namespace_cancel(msg)
            }
            message::Subscriber::TrackStatusRequest(msg) => self.recv_track_status_request(msg),
            message::Subscriber::Fetch(msg) => self.recv_fetch(msg),
            message::Subscriber::FetchCancel(msg) => self.recv_fetch_cancel(msg),
            message::Subscriber::SubscribeNamespace(msg) => self.recv_subscribe_namespace(msg),
            message::Subscriber::UnsubscribeNamespace(msg) => self.recv_unsubscribe_namespace(msg),
        }
    }

    fn recv_subscribe(&mut self, msg: message::Subscribe) -> Result<(), SessionError> {
        self.requests.validate_inbound(msg.id)?;

        // A subscriber proposing an alias we already serve is fatal.
        if self
            .subscribed
            .lock()
            .unwrap()
            .values()
            .any(|alias| *alias == msg.track_alias)
        {
            return Err(SessionError::DuplicateTrackAlias(msg.track_alias));
        }

        let subscribed = Subscribed::new(self.clone(), msg);
        if self.subscribed_queue.push(subscribed).is_err() {
            log::debug!("session closing, inbound subscribe dropped");
        }

        Ok(())
    }

    fn recv_subscribe_update(&mut self, msg: message::SubscribeUpdate) -> Result<(), SessionError> {
        // Narrowing an active subscription is left to the serving
        // application; the message is surfaced in logs only.
        log::debug!("SUBSCRIBE_UPDATE for id={} ignored", msg.id);
        Ok(())
    }

    fn recv_unsubscribe(&mut self, msg: message::Unsubscribe) -> Result<(), SessionError> {
        if self.subscribed.lock().unwrap().remove(&msg.id).is_some() {
            log::debug!("subscriber unsubscribed id={}", msg.id);
        }

        Ok(())
    }

    fn recv_publish_namespace_ok(
        &mut self,
        msg: message::PublishNamespaceOk,
    ) -> Result<(), SessionError> {
        if let Some(recv) = self.announces.lock().unwrap().get_mut(&msg.id) {
            if let Err(err) = recv.recv_ok() {
                log::debug!("ignoring PUBLISH_NAMESPACE_OK for id={}: {}", msg.id, err);
            }
        }

        Ok(())
    }

    fn recv_publish_namespace_error(
        &mut self,
        msg: message::PublishNamespaceError,
    ) -> Result<(), SessionError> {
        if let Some(recv) = self.announces.lock().unwrap().remove(&msg.id) {
            self.announce_ids.lock().unwrap().retain(|_, v| *v != msg.id);
            recv.close(TrackError::Closed(msg.error_code)).ok();
        }

        Ok(())
    }

    fn recv_publish_namespace_cancel(
        &mut self,
        msg: message::PublishNamespaceCancel,
    ) -> Result<(), SessionError> {
        let id = self.announce_ids.lock().unwrap().remove(&msg.namespace);
        if let Some(id) = id {
            if let Some(recv) = self.announces.lock().unwrap().remove(&id) {
                recv.close(TrackError::Closed(msg.error_code)).ok();
            }
        }

        Ok(())
    }

    fn recv_track_status_request(
        &mut self,
        msg: message::TrackStatusRequest,
    ) -> Result<(), SessionError> {
        self.requests.validate_inbound(msg.id)?;

        let requested = TrackStatusRequested::new(self.clone(), msg);
        if self.status_queue.push(requested).is_err() {
            log::debug!("session closing, inbound status request dropped");
        }

        Ok(())
    }

    fn recv_fetch(&mut self, msg: message::Fetch) -> Result<(), SessionError> {
        self.requests.validate_inbound(msg.id)?;

        // A conferencing endpoint keeps no history to serve.
        log::debug!("rejecting FETCH id={}: no history", msg.id);
        self.send_message(message::FetchError {
            id: msg.id,
            error_code: 0x3, // NOT_SUPPORTED
            reason_phrase: crate::coding::ReasonPhrase("no history available".to_string()),
        });

        Ok(())
    }

    fn recv_fetch_cancel(&mut self, msg: message::FetchCancel) -> Result<(), SessionError> {
        log::debug!("FETCH_CANCEL for id={} ignored, fetch not served", msg.id);
        Ok(())
    }

    fn recv_subscribe_namespace(
        &mut self,
        msg: message::SubscribeNamespace,
    ) -> Result<(), SessionError> {
        self.requests.validate_inbound(msg.id)?;

        // Namespace discovery is a relay concern; an endpoint declines.
        log::debug!("rejecting SUBSCRIBE_NAMESPACE id={}", msg.id);
        self.send_message(message::SubscribeNamespaceError {
            id: msg.id,
            error_code: 0x3, // NOT_SUPPORTED
            reason_phrase: crate::coding::ReasonPhrase("not a relay".to_string()),
        });

        Ok(())
    }

    fn recv_unsubscribe_namespace(
        &mut self,
        msg: message::UnsubscribeNamespace,
    ) -> Result<(), SessionError> {
        log::debug!(
            "UNSUBSCRIBE_NAMESPACE for {:?} ignored",
            msg.namespace_prefix
        );
        Ok(())
    }

    pub(super) async fn open_uni(&mut self) -> Result<web_transport::SendStream, SessionError> {
        Ok(self.webtransport.open_uni().await?)
    }

    pub(super) async fn send_datagram(&mut self, data: bytes::Bytes) -> Result<(), SessionError> {
        Ok(self.webtransport.send_datagram(data).await?)
    }

    /// A snapshot of the session's telemetry counters.
    pub fn stats(&self) -> crate::util::StatsSnapshot {
        self.stats.snapshot()
    }
}
