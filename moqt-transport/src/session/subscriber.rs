use std::collections::{hash_map, HashMap};
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::coding::{Decode, FullTrackName, KeyValuePairs, Tuple};
use crate::data::{self, StreamType};
use crate::message::{self, Message};
use crate::playout::Playout;
use crate::util::{self, SessionStats};
use crate::watch::{Queue, State};

use super::{
    Announced, AnnouncedRecv, Config, FetchActive, FetchRecv, FetchRequest, FetchVariant, Filter,
    NamespaceRecv, NamespaceSubscription, Phase, Reader, Requests, SessionError, SubscribeOptions,
    Subscription, SubscriptionRecv, TrackError,
};

/// How many times a subscription retries after SUBSCRIBE_ERROR with the
/// retry-track-alias code.
const MAX_ALIAS_RETRIES: u8 = 3;

/// The subscriber role: issues subscriptions, fetches, status queries and
/// namespace subscriptions, and routes inbound data streams to playout.
///
/// All maps are mutated from the session task; other tasks only post
/// messages or wait on the watch state inside the entries.
#[derive(Clone)]
pub struct Subscriber {
    /// Active outbound subscribes, keyed by request ID.
    subscribes: Arc<Mutex<HashMap<u64, SubscriptionRecv>>>,

    /// Track alias to request ID, for stream and datagram routing.
    subscribe_aliases: Arc<Mutex<HashMap<u64, u64>>>,

    /// Active outbound fetches, keyed by request ID.
    fetches: Arc<Mutex<HashMap<u64, FetchRecv>>>,

    /// Pending TRACK_STATUS_REQUESTs, keyed by request ID.
    statuses: Arc<Mutex<HashMap<u64, State<Option<message::TrackStatus>>>>>,

    /// Inbound announcements, keyed by namespace.
    announced: Arc<Mutex<HashMap<Tuple, AnnouncedRecv>>>,

    /// Active namespace subscriptions, keyed by request ID.
    namespaces: Arc<Mutex<HashMap<u64, NamespaceRecv>>>,

    /// Announcements that matched no namespace subscription.
    announced_queue: Queue<Announced>,

    aliases: super::AliasTable,
    next_alias: Arc<AtomicU64>,

    /// Streams waiting in staging for their subscription to activate.
    staging: Arc<AtomicUsize>,

    outgoing: Queue<Message>,
    requests: Requests,
    phase: State<Phase>,
    config: Config,
    stats: Arc<SessionStats>,
    mlog: Option<Arc<std::sync::Mutex<crate::mlog::MlogWriter>>>,
}

impl Subscriber {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        outgoing: Queue<Message>,
        requests: Requests,
        phase: State<Phase>,
        config: Config,
        stats: Arc<SessionStats>,
        mlog: Option<Arc<std::sync::Mutex<crate::mlog::MlogWriter>>>,
    ) -> Self {
        Self {
            subscribes: Default::default(),
            subscribe_aliases: Default::default(),
            fetches: Default::default(),
            statuses: Default::default(),
            announced: Default::default(),
            namespaces: Default::default(),
            announced_queue: Default::default(),
            aliases: Default::default(),
            next_alias: Default::default(),
            staging: Default::default(),
            outgoing,
            requests,
            phase,
            config,
            stats,
            mlog,
        }
    }

    fn mlog_event(&self, event: impl FnOnce(f64) -> crate::mlog::Event) {
        if let Some(mlog) = &self.mlog {
            if let Ok(mut mlog) = mlog.lock() {
                let time = mlog.elapsed_ms();
                let _ = mlog.add_event(event(time));
            }
        }
    }

    fn ensure_established(&self) -> Result<(), TrackError> {
        match *self.phase.lock() {
            Phase::Established => Ok(()),
            Phase::Draining => Err(TrackError::GoingAway),
            _ => Err(TrackError::Cancelled),
        }
    }

    /// Subscribe to a track. Suspends when request ID credit is exhausted,
    /// until the peer raises the ceiling.
    pub async fn subscribe(
        &mut self,
        full_track_name: FullTrackName,
        options: SubscribeOptions,
    ) -> Result<Subscription, TrackError> {
        self.ensure_established()?;

        let id = self.requests.allocate().await?;
        let track_alias = self.next_alias.fetch_add(1, Ordering::Relaxed);

        let msg = match options.filter {
            Filter::NextGroupStart => message::Subscribe::new_next_group_start(
                id,
                track_alias,
                full_track_name.clone(),
                options.priority,
                options.group_order,
                options.forward,
                options.params,
            ),
            Filter::LatestObject => message::Subscribe::new_latest_object(
                id,
                track_alias,
                full_track_name.clone(),
                options.priority,
                options.group_order,
                options.forward,
                options.params,
            ),
            Filter::AbsoluteStart(start) => message::Subscribe::new_absolute_start(
                id,
                track_alias,
                full_track_name.clone(),
                options.priority,
                options.group_order,
                options.forward,
                start,
                options.params,
            ),
            Filter::AbsoluteRange(start, end_group) => message::Subscribe::new_absolute_range(
                id,
                track_alias,
                full_track_name.clone(),
                options.priority,
                options.group_order,
                options.forward,
                start,
                end_group,
                options.params,
            )
            .map_err(|err| TrackError::Internal(err.to_string()))?,
        };

        self.aliases
            .insert(track_alias, full_track_name)
            .map_err(|err| TrackError::Internal(err.to_string()))?;

        let playout = Playout::produce_with(
            options.playout.unwrap_or(self.config.playout),
            self.config.clock.clone(),
            Some(self.stats.clone()),
        );

        let (subscription, recv) = Subscription::new(
            self.clone(),
            msg.clone(),
            self.config.request_timeout,
            playout,
        );

        self.subscribes.lock().unwrap().insert(id, recv);
        self.subscribe_aliases
            .lock()
            .unwrap()
            .insert(track_alias, id);

        self.send_message(msg);

        Ok(subscription)
    }

    /// Fetch a range of already published objects.
    pub async fn fetch(
        &mut self,
        variant: FetchVariant,
        priority: u8,
        group_order: message::GroupOrder,
        params: KeyValuePairs,
    ) -> Result<FetchRequest, TrackError> {
        self.ensure_established()?;

        let id = self.requests.allocate().await?;

        let (msg, full_track_name) = match variant {
            FetchVariant::Standalone {
                full_track_name,
                start,
                end,
            } => (
                message::Fetch::new_standalone(
                    id,
                    priority,
                    group_order,
                    full_track_name.clone(),
                    start,
                    end,
                    params,
                )
                .map_err(|err| TrackError::Internal(err.to_string()))?,
                full_track_name,
            ),
            FetchVariant::Relative {
                joining_request_id,
                joining_start,
            }
            | FetchVariant::Absolute {
                joining_request_id,
                joining_start,
            } => {
                let fetch_type = match variant {
                    FetchVariant::Relative { .. } => message::FetchType::Relative,
                    _ => message::FetchType::Absolute,
                };

                // Joining fetches resolve objects against the joined
                // subscription's track.
                let name = self
                    .subscribes
                    .lock()
                    .unwrap()
                    .get(&joining_request_id)
                    .map(|recv| recv.msg.full_track_name.clone())
                    .ok_or(TrackError::NotFound)?;

                (
                    message::Fetch::new_joining(
                        id,
                        priority,
                        group_order,
                        fetch_type,
                        joining_request_id,
                        joining_start,
                        params,
                    )
                    .map_err(|err| TrackError::Internal(err.to_string()))?,
                    name,
                )
            }
        };

        let (fetch, recv) = FetchRequest::new(
            self.clone(),
            id,
            full_track_name,
            self.config.request_timeout,
        );
        self.fetches.lock().unwrap().insert(id, recv);

        self.send_message(msg);

        Ok(fetch)
    }

    /// Query the status of a track, waiting for the TRACK_STATUS response.
    pub async fn track_status(
        &mut self,
        full_track_name: FullTrackName,
        params: KeyValuePairs,
    ) -> Result<message::TrackStatus, TrackError> {
        self.ensure_established()?;

        let id = self.requests.allocate().await?;

        let (wait, set) = State::new(None).split();
        self.statuses.lock().unwrap().insert(id, set);

        self.send_message(message::TrackStatusRequest {
            id,
            full_track_name,
            params,
        });

        let response = async {
            loop {
                {
                    let slot = wait.lock();
                    if let Some(status) = slot.as_ref() {
                        return Ok(status.clone());
                    }
                    match slot.modified() {
                        Some(notify) => notify,
                        None => return Err(TrackError::Cancelled),
                    }
                }
                .await;
            }
        };

        match tokio::time::timeout(self.config.request_timeout, response).await {
            Ok(res) => res,
            Err(_) => {
                // A reply past this point is late and gets dropped.
                self.statuses.lock().unwrap().remove(&id);
                Err(TrackError::Timeout)
            }
        }
    }

    /// Subscribe to announcements under a namespace prefix.
    pub async fn subscribe_namespace(
        &mut self,
        prefix: Tuple,
        params: KeyValuePairs,
    ) -> Result<NamespaceSubscription, TrackError> {
        self.ensure_established()?;

        let id = self.requests.allocate().await?;

        let (subscription, recv) = NamespaceSubscription::new(
            self.clone(),
            id,
            prefix.clone(),
            self.config.request_timeout,
        );
        self.namespaces.lock().unwrap().insert(id, recv);

        self.send_message(message::SubscribeNamespace {
            id,
            namespace_prefix: prefix,
            params,
        });

        Ok(subscription)
    }

    /// The next announcement that matched no namespace subscription.
    pub async fn announced(&mut self) -> Option<Announced> {
        self.announced_queue.pop().await
    }

    /// A snapshot of the session's telemetry counters.
    pub fn stats(&self) -> crate::util::StatsSnapshot {
        self.stats.snapshot()
    }

    pub(super) fn send_message<M: Into<Message>>(&mut self, msg: M) {
        // Failure means the session is shutting down; callers observe that
        // through their own state.
        let _ = self.outgoing.push(msg.into());
    }

    /// End a subscription locally: UNSUBSCRIBE goes out, the playout buffer
    /// closes and drains.
    pub(super) fn unsubscribe(&mut self, id: u64) {
        if let Some(recv) = self.subscribes.lock().unwrap().remove(&id) {
            let alias = recv.track_alias();
            self.subscribe_aliases.lock().unwrap().remove(&alias);
            self.aliases.remove(alias);
            recv.close(TrackError::Done).ok();
        }

        self.send_message(message::Unsubscribe { id });
    }

    pub(super) fn cancel_fetch(&mut self, id: u64, send_cancel: bool) {
        self.fetches.lock().unwrap().remove(&id);
        if send_cancel {
            self.send_message(message::FetchCancel { id });
        }
    }

    pub(super) fn unsubscribe_namespace(&mut self, id: u64, prefix: Tuple) {
        self.namespaces.lock().unwrap().remove(&id);
        self.send_message(message::UnsubscribeNamespace {
            namespace_prefix: prefix,
        });
    }

    pub(super) fn drop_announced(&mut self, namespace: &Tuple) {
        self.announced.lock().unwrap().remove(namespace);
    }

    /// Handle a control message sent by the publisher role of the peer.
    pub(super) fn recv_message(&mut self, msg: message::Publisher) -> Result<(), SessionError> {
        match msg {
            message::Publisher::SubscribeOk(msg) => self.recv_subscribe_ok(msg),
            message::Publisher::SubscribeError(msg) => self.recv_subscribe_error(msg),
            message::Publisher::SubscribeDone(msg) => self.recv_subscribe_done(msg),
            message::Publisher::PublishNamespace(msg) => self.recv_publish_namespace(msg),
            message::Publisher::PublishNamespaceDone(msg) => self.recv_publish_namespace_done(msg),
            message::Publisher::TrackStatus(msg) => self.recv_track_status(msg),
            message::Publisher::FetchOk(msg) => self.recv_fetch_ok(msg),
            message::Publisher::FetchError(msg) => self.recv_fetch_error(msg),
            message::Publisher::SubscribeNamespaceOk(msg) => self.recv_subscribe_namespace_ok(msg),
            message::Publisher::SubscribeNamespaceError(msg) => {
                self.recv_subscribe_namespace_error(msg)
            }
        }
    }

    fn recv_subscribe_ok(&mut self, msg: message::SubscribeOk) -> Result<(), SessionError> {
        if let Some(recv) = self.subscribes.lock().unwrap().get_mut(&msg.id) {
            if let Err(err) = recv.recv_ok(&msg) {
                log::debug!("ignoring SUBSCRIBE_OK for id={}: {}", msg.id, err);
            }
        } else {
            util::bump(&self.stats.late_responses_dropped);
            log::debug!("dropping late SUBSCRIBE_OK for id={}", msg.id);
        }

        Ok(())
    }

    fn recv_subscribe_error(&mut self, msg: message::SubscribeError) -> Result<(), SessionError> {
        let mut subscribes = self.subscribes.lock().unwrap();

        let mut recv = match subscribes.remove(&msg.id) {
            Some(recv) => recv,
            None => {
                util::bump(&self.stats.late_responses_dropped);
                log::debug!("dropping late SUBSCRIBE_ERROR for id={}", msg.id);
                return Ok(());
            }
        };

        let old_alias = recv.track_alias();

        if msg.is_retry() && recv.retries < MAX_ALIAS_RETRIES {
            if let Ok(new_id) = self.requests.try_allocate() {
                // Rebind atomically; a collision with an existing alias is
                // fatal to the session.
                self.aliases.rebind(old_alias, msg.track_alias)?;

                let mut ids = self.subscribe_aliases.lock().unwrap();
                ids.remove(&old_alias);
                ids.insert(msg.track_alias, new_id);
                drop(ids);

                let subscribe = recv.reissue(new_id, msg.track_alias);
                subscribes.insert(new_id, recv);
                drop(subscribes);

                log::debug!(
                    "retrying subscribe id={} with alias {}",
                    new_id,
                    msg.track_alias
                );
                self.send_message(subscribe);
                return Ok(());
            }
        }

        drop(subscribes);
        self.subscribe_aliases.lock().unwrap().remove(&old_alias);
        self.aliases.remove(old_alias);
        recv.close(TrackError::Closed(msg.error_code)).ok();

        Ok(())
    }

    fn recv_subscribe_done(&mut self, msg: message::SubscribeDone) -> Result<(), SessionError> {
        let recv = self.subscribes.lock().unwrap().remove(&msg.id);
        let recv = match recv {
            Some(recv) => recv,
            None => {
                util::bump(&self.stats.late_responses_dropped);
                return Ok(());
            }
        };

        let alias = recv.track_alias();
        self.subscribe_aliases.lock().unwrap().remove(&alias);
        self.aliases.remove(alias);

        let err = match msg.status_code {
            message::SubscribeDoneCode::TrackEnded
            | message::SubscribeDoneCode::SubscriptionEnded => TrackError::Done,
            code => TrackError::Closed(code as u64),
        };
        recv.close(err).ok();

        Ok(())
    }

    fn recv_publish_namespace(
        &mut self,
        msg: message::PublishNamespace,
    ) -> Result<(), SessionError> {
        self.requests.validate_inbound(msg.id)?;

        let mut announced = self.announced.lock().unwrap();
        let entry = match announced.entry(msg.namespace.clone()) {
            hash_map::Entry::Occupied(_) => {
                // A duplicate namespace is rejected, not fatal.
                drop(announced);
                log::warn!("duplicate PUBLISH_NAMESPACE for {:?}", msg.namespace);
                self.send_message(message::PublishNamespaceError {
                    id: msg.id,
                    error_code: TrackError::Duplicate.code(),
                    reason_phrase: TrackError::Duplicate.reason_phrase(),
                });
                return Ok(());
            }
            hash_map::Entry::Vacant(entry) => entry,
        };

        let (handle, recv) = Announced::new(self.clone(), msg.id, msg.namespace.clone());
        entry.insert(recv);
        drop(announced);

        // Route to the namespace subscription covering this prefix, or the
        // session-level queue when none does.
        let mut handle = Some(handle);
        for recv in self.namespaces.lock().unwrap().values_mut() {
            if !msg.namespace.starts_with(&recv.prefix) {
                continue;
            }
            if let Some(h) = handle.take() {
                match recv.deliver(h) {
                    Ok(()) => break,
                    Err(returned) => handle = Some(returned),
                }
            }
        }

        if let Some(handle) = handle {
            if let Err(handle) = self.announced_queue.push(handle) {
                handle.close(TrackError::Cancelled);
            }
        }

        Ok(())
    }

    fn recv_publish_namespace_done(
        &mut self,
        msg: message::PublishNamespaceDone,
    ) -> Result<(), SessionError> {
        if let Some(recv) = self.announced.lock().unwrap().remove(&msg.namespace) {
            recv.recv_done().ok();
        }

        Ok(())
    }

    fn recv_track_status(&mut self, msg: message::TrackStatus) -> Result<(), SessionError> {
        let slot = self.statuses.lock().unwrap().remove(&msg.id);
        match slot {
            Some(slot) => {
                if let Some(mut slot) = slot.lock_mut() {
                    *slot = Some(msg);
                }
            }
            None => {
                util::bump(&self.stats.late_responses_dropped);
                log::debug!("dropping late TRACK_STATUS for id={}", msg.id);
            }
        }

        Ok(())
    }

    fn recv_fetch_ok(&mut self, msg: message::FetchOk) -> Result<(), SessionError> {
        if let Some(recv) = self.fetches.lock().unwrap().get_mut(&msg.id) {
            let ok = FetchActive {
                group_order: msg.group_order,
                end_of_track: msg.end_of_track,
                end_location: msg.end_location,
            };
            if let Err(err) = recv.recv_ok(ok) {
                log::debug!("ignoring FETCH_OK for id={}: {}", msg.id, err);
            }
        } else {
            util::bump(&self.stats.late_responses_dropped);
        }

        Ok(())
    }

    fn recv_fetch_error(&mut self, msg: message::FetchError) -> Result<(), SessionError> {
        match self.fetches.lock().unwrap().remove(&msg.id) {
            Some(recv) => {
                recv.close(TrackError::Closed(msg.error_code)).ok();
            }
            None => util::bump(&self.stats.late_responses_dropped),
        }

        Ok(())
    }

    fn recv_subscribe_namespace_ok(
        &mut self,
        msg: message::SubscribeNamespaceOk,
    ) -> Result<(), SessionError> {
        if let Some(recv) = self.namespaces.lock().unwrap().get_mut(&msg.id) {
            if let Err(err) = recv.recv_ok() {
                log::debug!("ignoring SUBSCRIBE_NAMESPACE_OK for id={}: {}", msg.id, err);
            }
        } else {
            util::bump(&self.stats.late_responses_dropped);
        }

        Ok(())
    }

    fn recv_subscribe_namespace_error(
        &mut self,
        msg: message::SubscribeNamespaceError,
    ) -> Result<(), SessionError> {
        match self.namespaces.lock().unwrap().remove(&msg.id) {
            Some(recv) => {
                recv.close(TrackError::Closed(msg.error_code)).ok();
            }
            None => util::bump(&self.stats.late_responses_dropped),
        }

        Ok(())
    }

    /// Serve one inbound unidirectional data stream until it finishes.
    ///
    /// Decode errors abort only this stream; the subscription survives.
    pub(super) async fn recv_stream(
        mut self,
        stream: web_transport::RecvStream,
    ) -> Result<(), SessionError> {
        let mut reader = Reader::new(stream);

        match reader.decode().await? {
            StreamType::Subgroup => self.recv_subgroup_stream(reader).await,
            StreamType::Fetch => self.recv_fetch_stream(reader).await,
        }
    }

    async fn recv_subgroup_stream(&mut self, mut reader: Reader) -> Result<(), SessionError> {
        let header: data::StreamHeader = reader.decode().await?;
        self.mlog_event(|time| crate::mlog::stream_header_parsed(time, &header));

        // Streams racing their SUBSCRIBE_OK wait in a bounded staging set.
        let full_track_name = match self.aliases.get(header.track_alias) {
            Some(name) => name,
            None => {
                if self.staging.fetch_add(1, Ordering::AcqRel) >= self.config.staging_limit {
                    self.staging.fetch_sub(1, Ordering::AcqRel);
                    util::bump(&self.stats.staged_streams_dropped);
                    log::warn!(
                        "staging full, dropping stream for alias {}",
                        header.track_alias
                    );
                    return Ok(());
                }

                let waited = tokio::time::timeout(
                    self.config.staging_timeout,
                    self.aliases.wait_for(header.track_alias),
                )
                .await;
                self.staging.fetch_sub(1, Ordering::AcqRel);

                match waited {
                    Ok(Some(name)) => name,
                    Ok(None) => return Ok(()),
                    Err(_) => {
                        util::bump(&self.stats.staged_streams_dropped);
                        log::debug!(
                            "subscription for alias {} never activated, dropping stream",
                            header.track_alias
                        );
                        return Ok(());
                    }
                }
            }
        };

        let playout = {
            let id = self
                .subscribe_aliases
                .lock()
                .unwrap()
                .get(&header.track_alias)
                .copied();
            match id {
                Some(id) => self
                    .subscribes
                    .lock()
                    .unwrap()
                    .get(&id)
                    .map(|recv| recv.playout()),
                None => None,
            }
        };
        let playout = match playout {
            Some(playout) => playout,
            // Unsubscribed while the header was in flight.
            None => return Ok(()),
        };

        while !reader.done().await? {
            let frame: data::StreamObject = reader.decode().await?;
            let object = frame.into_object(&header, full_track_name.clone());
            let location = object.location;

            let evicted = {
                let mut playout = playout.lock().await;
                match playout.push(object).await {
                    Ok(evicted) => evicted,
                    // The subscription ended; stop reading.
                    Err(_) => break,
                }
            };

            if evicted > 0 {
                self.mlog_event(|time| {
                    crate::mlog::playout_evicted(time, header.track_alias, location, evicted)
                });
            }
        }

        Ok(())
    }

    async fn recv_fetch_stream(&mut self, mut reader: Reader) -> Result<(), SessionError> {
        let header: data::FetchHeader = reader.decode().await?;

        let feeder = {
            let fetches = self.fetches.lock().unwrap();
            fetches
                .get(&header.request_id)
                .map(|recv| (recv.feeder(), recv.full_track_name.clone()))
        };
        let (mut feeder, full_track_name) = match feeder {
            Some(found) => found,
            None => {
                log::debug!("dropping fetch stream for unknown id={}", header.request_id);
                return Ok(());
            }
        };

        while !reader.done().await? {
            let frame: data::FetchObject = reader.decode().await?;
            if feeder.push(frame.into_object(full_track_name.clone())).is_err() {
                break;
            }
        }

        feeder.finish();

        Ok(())
    }

    /// Handle one inbound datagram. Unknown aliases are dropped; datagrams
    /// do not wait in staging.
    pub(super) async fn recv_datagram(&mut self, datagram: bytes::Bytes) -> Result<(), SessionError> {
        let mut cursor = io::Cursor::new(datagram);
        let datagram = data::Datagram::decode(&mut cursor)?;

        let full_track_name = match self.aliases.get(datagram.track_alias) {
            Some(name) => name,
            None => {
                log::debug!(
                    "dropping datagram for unknown alias {}",
                    datagram.track_alias
                );
                return Ok(());
            }
        };

        let playout = {
            let id = self
                .subscribe_aliases
                .lock()
                .unwrap()
                .get(&datagram.track_alias)
                .copied();
            match id {
                Some(id) => self
                    .subscribes
                    .lock()
                    .unwrap()
                    .get(&id)
                    .map(|recv| recv.playout()),
                None => None,
            }
        };

        if let Some(playout) = playout {
            let object = datagram.into_object(full_track_name);
            let mut playout = playout.lock().await;
            playout.push(object).await.ok();
        }

        Ok(())
    }

    pub(super) fn bump_stream_error(&self) {
        util::bump(&self.stats.stream_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::Location;
    use crate::data::ForwardingPreference;
    use crate::message::GroupOrder;
    use crate::session::Role;

    fn subscriber() -> (Subscriber, Queue<Message>, State<Phase>) {
        let (tx, rx) = Queue::default().split();
        let requests = Requests::new(Role::Client, 16, 64, tx.clone());
        let phase = State::new(Phase::Established);
        let subscriber = Subscriber::new(
            tx,
            requests,
            phase.clone(),
            Config::default(),
            SessionStats::new(),
            None,
        );
        (subscriber, rx, phase)
    }

    fn track() -> FullTrackName {
        FullTrackName::from_utf8_path("conf/room1", "video")
    }

    fn object(group: u64, object_id: u64) -> crate::data::MoqtObject {
        crate::data::MoqtObject::try_new(
            track(),
            Location::new(group, object_id),
            127,
            ForwardingPreference::Subgroup,
            Some(0),
            Default::default(),
            bytes::Bytes::from_static(b"frame"),
        )
        .unwrap()
    }

    fn subscribe_ok(id: u64) -> message::Publisher {
        message::Publisher::SubscribeOk(message::SubscribeOk {
            id,
            expires: 0,
            group_order: GroupOrder::Ascending,
            content_exists: false,
            largest_location: None,
            params: Default::default(),
        })
    }

    #[tokio::test]
    async fn subscribe_lifecycle() {
        let (mut subscriber, mut rx, _phase) = subscriber();

        let mut subscription = subscriber
            .subscribe(track(), Default::default())
            .await
            .unwrap();

        let msg = match rx.pop().await.unwrap() {
            Message::Subscribe(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };
        assert_eq!(msg.id, 0);
        assert_eq!(msg.full_track_name, track());

        // Pending -> Active on SUBSCRIBE_OK.
        subscriber.recv_message(subscribe_ok(msg.id)).unwrap();
        let active = subscription.active().await.unwrap();
        assert_eq!(active.group_order, GroupOrder::Ascending);

        // Feed objects the way a data stream task would.
        let playout = {
            let subscribes = subscriber.subscribes.lock().unwrap();
            subscribes.get(&msg.id).unwrap().playout()
        };
        playout.lock().await.push(object(1, 0)).await.unwrap();
        playout.lock().await.push(object(1, 1)).await.unwrap();

        assert_eq!(
            subscription.next_object().await.unwrap().location,
            Location::new(1, 0)
        );

        // Active -> Ended on SUBSCRIBE_DONE; the buffer drains first.
        subscriber
            .recv_message(message::Publisher::SubscribeDone(message::SubscribeDone {
                id: msg.id,
                status_code: message::SubscribeDoneCode::TrackEnded,
                stream_count: 1,
                reason_phrase: crate::coding::ReasonPhrase("track ended".to_string()),
            }))
            .unwrap();

        assert_eq!(subscription.closed().await.unwrap_err(), TrackError::Done);
        assert_eq!(
            subscription.next_object().await.unwrap().location,
            Location::new(1, 1)
        );
        assert!(subscription.next_object().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_error_ends_pending() {
        let (mut subscriber, mut rx, _phase) = subscriber();

        let subscription = subscriber
            .subscribe(track(), Default::default())
            .await
            .unwrap();
        let msg = match rx.pop().await.unwrap() {
            Message::Subscribe(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };

        subscriber
            .recv_message(message::Publisher::SubscribeError(message::SubscribeError {
                id: msg.id,
                error_code: message::error_code::TRACK_DOES_NOT_EXIST,
                reason_phrase: crate::coding::ReasonPhrase("no such track".to_string()),
                track_alias: msg.track_alias,
            }))
            .unwrap();

        assert_eq!(
            subscription.closed().await.unwrap_err(),
            TrackError::Closed(message::error_code::TRACK_DOES_NOT_EXIST)
        );
    }

    #[tokio::test]
    async fn subscribe_retries_with_new_alias() {
        let (mut subscriber, mut rx, _phase) = subscriber();

        let mut subscription = subscriber
            .subscribe(track(), Default::default())
            .await
            .unwrap();
        let first = match rx.pop().await.unwrap() {
            Message::Subscribe(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };

        subscriber
            .recv_message(message::Publisher::SubscribeError(message::SubscribeError {
                id: first.id,
                error_code: message::error_code::RETRY_TRACK_ALIAS,
                reason_phrase: crate::coding::ReasonPhrase("alias taken".to_string()),
                track_alias: 99,
            }))
            .unwrap();

        // The subscribe is reissued under a fresh id with the new alias.
        let second = match rx.pop().await.unwrap() {
            Message::Subscribe(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };
        assert!(second.id > first.id);
        assert_eq!(second.track_alias, 99);
        assert_eq!(subscriber.aliases.get(99), Some(track()));
        assert_eq!(subscriber.aliases.get(first.track_alias), None);

        subscriber.recv_message(subscribe_ok(second.id)).unwrap();
        subscription.active().await.unwrap();
    }

    #[tokio::test]
    async fn unsubscribe_on_drop() {
        let (mut subscriber, mut rx, _phase) = subscriber();

        let subscription = subscriber
            .subscribe(track(), Default::default())
            .await
            .unwrap();
        let msg = match rx.pop().await.unwrap() {
            Message::Subscribe(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };

        drop(subscription);
        match rx.pop().await.unwrap() {
            Message::Unsubscribe(unsub) => assert_eq!(unsub.id, msg.id),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(subscriber.subscribes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn track_status_roundtrip() {
        let (subscriber, mut rx, _phase) = subscriber();

        let mut requester = subscriber.clone();
        let task = tokio::spawn(async move {
            requester.track_status(track(), Default::default()).await
        });

        let msg = match rx.pop().await.unwrap() {
            Message::TrackStatusRequest(msg) => msg,
            other => panic!("unexpected message: {:?}", other),
        };

        let mut responder = subscriber.clone();
        responder
            .recv_message(message::Publisher::TrackStatus(message::TrackStatus {
                id: msg.id,
                status_code: message::TrackStatusCode::InProgress,
                largest_location: Location::new(81, 81),
                params: Default::default(),
            }))
            .unwrap();

        let status = task.await.unwrap().unwrap();
        assert_eq!(status.largest_location, Location::new(81, 81));
    }

    #[tokio::test]
    async fn late_track_status_is_dropped() {
        let (mut subscriber, _rx, _phase) = subscriber();

        subscriber
            .recv_message(message::Publisher::TrackStatus(message::TrackStatus {
                id: 1,
                status_code: message::TrackStatusCode::InProgress,
                largest_location: Location::new(0, 1),
                params: Default::default(),
            }))
            .unwrap();

        assert_eq!(subscriber.stats().late_responses_dropped, 1);
    }

    #[tokio::test]
    async fn draining_refuses_new_requests() {
        let (mut subscriber, _rx, phase) = subscriber();

        *phase.lock_mut().unwrap() = Phase::Draining;

        let err = subscriber
            .subscribe(track(), Default::default())
            .await
            .unwrap_err();
        assert_eq!(err, TrackError::GoingAway);
    }

    #[tokio::test]
    async fn duplicate_inbound_namespace_is_rejected() {
        let (mut subscriber, mut rx, _phase) = subscriber();

        let namespace = crate::coding::Tuple::from_utf8_path("conf/room1/bob");
        let publish = |id| {
            message::Publisher::PublishNamespace(message::PublishNamespace {
                id,
                namespace: namespace.clone(),
                params: Default::default(),
            })
        };

        subscriber.recv_message(publish(1)).unwrap();
        let first = subscriber.announced().await.unwrap();
        assert_eq!(first.info.namespace, namespace);

        subscriber.recv_message(publish(3)).unwrap();
        match rx.pop().await.unwrap() {
            Message::PublishNamespaceError(err) => assert_eq!(err.id, 3),
            other => panic!("unexpected message: {:?}", other),
        }

        // Keep the handle alive until the end so no CANCEL confuses rx.
        drop(first);
    }
}
