//! The connection-level state machine: one control stream, many data
//! streams, and the request bookkeeping between them.
//!
//! A [Session] is created by [Session::connect] (client) or
//! [Session::accept] (server) and then driven by [Session::run]. The
//! [Publisher] and [Subscriber] halves are handed to the application and
//! post control messages through the session's outgoing queue; only the
//! session task touches the control stream itself.

mod aliases;
mod announce;
mod announced;
mod config;
mod error;
mod fetch;
mod namespace;
mod publisher;
mod reader;
mod requests;
mod subscribe;
mod subscriber;
mod track;
mod writer;

pub use announce::*;
pub use announced::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use namespace::*;
pub use publisher::*;
pub use requests::Role;
pub use subscribe::*;
pub use subscriber::*;
pub use track::*;

use aliases::AliasTable;
use reader::Reader;
use requests::Requests;
use writer::Writer;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{stream::FuturesUnordered, StreamExt};

use crate::coding::{KeyValuePairs, SessionUri};
use crate::message::{self, Message};
use crate::mlog;
use crate::setup::{self, ParameterType, Version};
use crate::util::{self, SessionStats};
use crate::watch::{Queue, State};

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Phase {
    Handshaking,
    Established,
    /// GOAWAY received: existing requests drain, new ones are refused.
    Draining,
    Closed,
}

/// Observes inbound GOAWAY redirects.
pub struct GoAwayWatch {
    queue: Queue<SessionUri>,
}

impl GoAwayWatch {
    /// Resolves when the server asks us to move; an empty URI means
    /// "reconnect to the same endpoint". `None` once the session closes.
    pub async fn redirected(&mut self) -> Option<SessionUri> {
        self.queue.pop().await
    }
}

#[must_use = "run() must be called"]
pub struct Session {
    webtransport: web_transport::Session,

    sender: Writer,
    recver: Reader,

    publisher: Publisher,
    subscriber: Subscriber,

    outgoing: Queue<Message>,
    requests: Requests,
    phase: State<Phase>,

    goaway: Queue<SessionUri>,
    goaway_watch: Queue<SessionUri>,

    config: Config,
    stats: Arc<SessionStats>,
    mlog: Option<Arc<Mutex<mlog::MlogWriter>>>,
}

impl Session {
    fn new(
        webtransport: web_transport::Session,
        sender: Writer,
        recver: Reader,
        config: Config,
        role: Role,
        peer_max: u64,
    ) -> (Self, Publisher, Subscriber) {
        let outgoing = Queue::default().split();
        let requests = Requests::new(role, peer_max, config.max_requests, outgoing.0.clone());

        // The handshake already ran in connect/accept; mark it done.
        let phase = State::new(Phase::Handshaking);
        if let Some(mut p) = phase.lock_mut() {
            *p = Phase::Established;
        }
        let stats = SessionStats::new();
        let goaway = Queue::default().split();

        let mlog = config.mlog_path.as_ref().and_then(|path| {
            match mlog::MlogWriter::new(path) {
                Ok(writer) => Some(Arc::new(Mutex::new(writer))),
                Err(err) => {
                    log::warn!("failed to open mlog at {:?}: {}", path, err);
                    None
                }
            }
        });

        let publisher = Publisher::new(
            webtransport.clone(),
            outgoing.0.clone(),
            requests.clone(),
            phase.clone(),
            config.clone(),
            stats.clone(),
        );
        let subscriber = Subscriber::new(
            outgoing.0,
            requests.clone(),
            phase.clone(),
            config.clone(),
            stats.clone(),
            mlog.clone(),
        );

        let session = Self {
            webtransport,
            sender,
            recver,
            publisher: publisher.clone(),
            subscriber: subscriber.clone(),
            outgoing: outgoing.1,
            requests,
            phase,
            goaway: goaway.0,
            goaway_watch: goaway.1,
            config,
            stats,
            mlog,
        };

        (session, publisher, subscriber)
    }

    /// Open the control stream and perform the client side of the
    /// handshake: CLIENT_SETUP out, SERVER_SETUP back, versions checked.
    pub async fn connect(
        mut session: web_transport::Session,
        config: Config,
    ) -> Result<(Session, Publisher, Subscriber), SessionError> {
        let control = session.open_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);

        let versions: setup::Versions = [Version::DRAFT_11].into();

        let mut params = KeyValuePairs::new();
        params.set_int(ParameterType::MaxRequestId.into(), config.max_requests)?;

        let client = setup::Client {
            versions: versions.clone(),
            params,
        };
        log::debug!("sending CLIENT_SETUP: {:?}", client);
        sender.encode(&client).await?;

        let server: setup::Server =
            tokio::time::timeout(config.control_message_timeout, recver.decode())
                .await
                .map_err(|_| SessionError::ControlMessageTimeout)??;
        log::debug!("received SERVER_SETUP: {:?}", server);

        if server.version != Version::DRAFT_11 {
            return Err(SessionError::Version(
                versions,
                [server.version].into(),
            ));
        }

        let peer_max = max_request_id_param(&server.params);
        Ok(Self::new(
            session,
            sender,
            recver,
            config,
            Role::Client,
            peer_max,
        ))
    }

    /// Accept the control stream and perform the server side of the
    /// handshake.
    pub async fn accept(
        mut session: web_transport::Session,
        config: Config,
    ) -> Result<(Session, Publisher, Subscriber), SessionError> {
        let control = session.accept_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);

        let client: setup::Client =
            tokio::time::timeout(config.control_message_timeout, recver.decode())
                .await
                .map_err(|_| SessionError::ControlMessageTimeout)??;
        log::debug!("received CLIENT_SETUP: {:?}", client);

        if !client.versions.contains(&Version::DRAFT_11) {
            return Err(SessionError::Version(
                client.versions,
                [Version::DRAFT_11].into(),
            ));
        }

        let mut params = KeyValuePairs::new();
        params.set_int(ParameterType::MaxRequestId.into(), config.max_requests)?;

        let server = setup::Server {
            version: Version::DRAFT_11,
            params,
        };
        log::debug!("sending SERVER_SETUP: {:?}", server);
        sender.encode(&server).await?;

        let peer_max = max_request_id_param(&client.params);
        Ok(Self::new(
            session,
            sender,
            recver,
            config,
            Role::Server,
            peer_max,
        ))
    }

    /// A handle that observes GOAWAY redirects.
    pub fn goaway_watch(&self) -> GoAwayWatch {
        GoAwayWatch {
            queue: self.goaway_watch.clone(),
        }
    }

    /// A snapshot of the session's telemetry counters.
    pub fn stats(&self) -> util::StatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the session deliberately with a termination code.
    pub fn close(mut self, code: u64, reason: &str) {
        if let Some(mut phase) = self.phase.lock_mut() {
            *phase = Phase::Closed;
        }
        self.webtransport.close(code as u32, reason);
    }

    /// Drive the session until it terminates.
    pub async fn run(self) -> Result<(), SessionError> {
        let mut webtransport = self.webtransport.clone();
        let phase = self.phase.clone();

        let res = tokio::select! {
            res = Self::run_send(self.sender, self.outgoing, self.stats.clone(), self.mlog.clone()) => res,
            res = Self::run_recv(
                self.recver,
                self.publisher,
                self.subscriber.clone(),
                self.requests,
                self.phase,
                self.goaway,
                self.stats,
                self.mlog,
            ) => res,
            res = Self::run_streams(self.webtransport.clone(), self.subscriber.clone()) => res,
            res = Self::run_datagrams(self.webtransport, self.subscriber) => res,
            res = Self::run_goaway(phase.clone(), self.config.goaway_grace) => res,
        };

        if let Some(mut p) = phase.lock_mut() {
            *p = Phase::Closed;
        }

        match &res {
            Ok(()) => webtransport.close(termination::NO_ERROR as u32, "closed"),
            Err(err) => {
                log::warn!("session terminated: {} (code {:#x})", err, err.code());
                webtransport.close(err.code() as u32, &err.to_string());
            }
        }

        res
    }

    async fn run_send(
        mut sender: Writer,
        mut outgoing: Queue<Message>,
        stats: Arc<SessionStats>,
        mlog: Option<Arc<Mutex<mlog::MlogWriter>>>,
    ) -> Result<(), SessionError> {
        while let Some(msg) = outgoing.pop().await {
            log::debug!("sending message: {:?}", msg);
            util::bump(&stats.control_sent);

            if let Some(mlog) = &mlog {
                if let Ok(mut mlog) = mlog.lock() {
                    let time = mlog.elapsed_ms();
                    let _ = mlog.add_event(mlog::control_message_created(time, &msg));
                }
            }

            sender.encode(&msg).await?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_recv(
        mut recver: Reader,
        mut publisher: Publisher,
        mut subscriber: Subscriber,
        mut requests: Requests,
        phase: State<Phase>,
        mut goaway: Queue<SessionUri>,
        stats: Arc<SessionStats>,
        mlog: Option<Arc<Mutex<mlog::MlogWriter>>>,
    ) -> Result<(), SessionError> {
        loop {
            let msg: Message = recver.decode().await?;
            log::debug!("received message: {:?}", msg);
            util::bump(&stats.control_received);

            if let Some(mlog) = &mlog {
                if let Ok(mut mlog) = mlog.lock() {
                    let time = mlog.elapsed_ms();
                    let _ = mlog.add_event(mlog::control_message_parsed(time, &msg));
                }
            }

            // Session-scoped messages are handled here; the rest dispatch
            // to the role that handles them.
            let msg = match msg {
                Message::GoAway(msg) => {
                    log::info!("received GOAWAY, draining");
                    if let Some(mut p) = phase.lock_mut() {
                        if *p == Phase::Established {
                            *p = Phase::Draining;
                        }
                    }
                    let _ = goaway.push(msg.new_session_uri);
                    continue;
                }
                Message::MaxRequestId(msg) => {
                    requests.set_peer_max(msg.request_id)?;
                    continue;
                }
                Message::RequestsBlocked(msg) => {
                    log::debug!("peer blocked at request id {}", msg.max_request_id);
                    continue;
                }
                msg => msg,
            };

            let msg = match TryInto::<message::Publisher>::try_into(msg) {
                Ok(msg) => {
                    subscriber.recv_message(msg)?;
                    continue;
                }
                Err(msg) => msg,
            };

            match TryInto::<message::Subscriber>::try_into(msg) {
                Ok(msg) => publisher.recv_message(msg)?,
                Err(msg) => log::warn!("unroutable message: {:?}", msg),
            }
        }
    }

    async fn run_streams(
        mut webtransport: web_transport::Session,
        subscriber: Subscriber,
    ) -> Result<(), SessionError> {
        let mut tasks = FuturesUnordered::new();

        loop {
            tokio::select! {
                res = webtransport.accept_uni() => {
                    let stream = res?;
                    let subscriber = subscriber.clone();

                    tasks.push(async move {
                        let errors = subscriber.clone();
                        if let Err(err) = subscriber.recv_stream(stream).await {
                            errors.bump_stream_error();
                            log::warn!("failed to serve data stream: {}", err);
                        }
                    });
                },
                _ = tasks.next(), if !tasks.is_empty() => {},
            };
        }
    }

    async fn run_datagrams(
        mut webtransport: web_transport::Session,
        mut subscriber: Subscriber,
    ) -> Result<(), SessionError> {
        loop {
            let datagram = webtransport.recv_datagram().await?;

            if let Err(err) = subscriber.recv_datagram(datagram).await {
                subscriber.bump_stream_error();
                log::warn!("failed to handle datagram: {}", err);
            }
        }
    }

    /// After GOAWAY, give in-flight work a grace period and then terminate.
    async fn run_goaway(phase: State<Phase>, grace: Duration) -> Result<(), SessionError> {
        loop {
            {
                let p = phase.lock();
                if *p == Phase::Draining {
                    break;
                }
                match p.modified() {
                    Some(notify) => notify,
                    None => return Ok(()),
                }
            }
            .await;
        }

        tokio::time::sleep(grace).await;
        Err(SessionError::GoAwayTimeout)
    }
}

fn max_request_id_param(params: &KeyValuePairs) -> u64 {
    // Absent means zero: no requests until a MAX_REQUEST_ID arrives.
    params
        .get(ParameterType::MaxRequestId.into())
        .and_then(|kvp| kvp.as_int())
        .unwrap_or(0)
}
