//! The persistent event stream
//!
//! A single task drives the whole lifecycle: connect, expect Hello, identify
//! or resume, then a read loop multiplexed with the heartbeat timer. Every
//! exit from the read loop goes through one policy decision: resume the
//! session, discard it and identify fresh, retry the transport, or give up.

use std::sync::Arc;
use std::time::Duration;

use parley_cache::StateCache;
use parley_common::ClientConfig;
use tokio::sync::watch;

use super::heartbeat::Heartbeat;
use super::{Backoff, ConnectionState, Session};
use crate::dispatch::Dispatcher;
use crate::error::GatewayError;
use crate::events::Event;
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode, ResumePayload,
    ShardInfo,
};
use crate::transport::{Connector, Frame, Transport};

/// How long to wait for the server's Hello after the socket opens
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Why one connection attempt ended
#[derive(Debug)]
enum AttemptEnd {
    /// Try again with the existing session
    Resume,
    /// Discard the session, reconnect with a fresh identify
    Reidentify,
    /// The caller asked us to stop
    Shutdown,
    /// Not worth retrying (bad credentials, bad shard config)
    Fatal(GatewayError),
}

pub struct EventStream {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    gateway_url: String,
    cache: Arc<StateCache>,
    dispatcher: Arc<Dispatcher>,
    session: Option<Session>,
    seq: u64,
    state_tx: watch::Sender<ConnectionState>,
    ready_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Caller-facing view of a running stream
#[derive(Debug, Clone)]
pub struct EventStreamHandle {
    shutdown: Arc<watch::Sender<bool>>,
    ready: watch::Receiver<bool>,
    state: watch::Receiver<ConnectionState>,
}

impl EventStreamHandle {
    /// Request shutdown; idempotent
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// True while a session is established and events are flowing
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the stream is ready, or give up after `timeout`
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.ready.clone();
        let wait = async {
            loop {
                if *rx.borrow_and_update() {
                    return true;
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }
}

impl EventStream {
    pub fn new(
        config: ClientConfig,
        gateway_url: impl Into<String>,
        connector: Arc<dyn Connector>,
        cache: Arc<StateCache>,
        dispatcher: Arc<Dispatcher>,
    ) -> (Self, EventStreamHandle) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (ready_tx, ready_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let stream = Self {
            config,
            connector,
            gateway_url: gateway_url.into(),
            cache,
            dispatcher,
            session: None,
            seq: 0,
            state_tx,
            ready_tx,
            shutdown_rx,
        };
        let handle = EventStreamHandle {
            shutdown: Arc::new(shutdown_tx),
            ready: ready_rx,
            state: state_rx,
        };
        (stream, handle)
    }

    /// Run the stream until shutdown or a fatal condition
    ///
    /// Blocks the calling task for the lifetime of the connection, including
    /// every reconnect cycle. A clean requested close returns `Ok`.
    pub async fn connect(mut self) -> Result<(), GatewayError> {
        let mut backoff = Backoff::new(&self.config.gateway.backoff);

        loop {
            if *self.shutdown_rx.borrow() {
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            self.set_state(ConnectionState::Handshaking);
            let url = self
                .session
                .as_ref()
                .and_then(|s| s.resume_url.clone())
                .unwrap_or_else(|| self.gateway_url.clone());

            let mut transport = match self.connector.connect(&url).await {
                Ok(transport) => transport,
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(error = %e, delay = ?delay, "connect failed, retrying");
                    self.set_state(ConnectionState::Reconnecting);
                    if self.sleep_or_shutdown(delay).await {
                        self.set_state(ConnectionState::Closed);
                        return Ok(());
                    }
                    continue;
                }
            };

            let end = self.run_attempt(transport.as_mut(), &mut backoff).await;
            let _ = transport.close().await;
            let _ = self.ready_tx.send(false);

            match end {
                AttemptEnd::Shutdown => {
                    self.set_state(ConnectionState::Closed);
                    tracing::info!("event stream closed by request");
                    return Ok(());
                }
                AttemptEnd::Fatal(e) => {
                    self.set_state(ConnectionState::Closed);
                    tracing::error!(error = %e, "event stream failed fatally");
                    return Err(e);
                }
                AttemptEnd::Resume => {}
                AttemptEnd::Reidentify => {
                    self.session = None;
                    self.seq = 0;
                }
            }

            self.dispatcher.dispatch(Event::GatewayDisconnected);
            self.set_state(ConnectionState::Reconnecting);
            let delay = backoff.next_delay();
            tracing::info!(
                delay = ?delay,
                resume = self.session.is_some(),
                "connection lost, reconnecting"
            );
            if self.sleep_or_shutdown(delay).await {
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }
        }
    }

    /// One connection attempt: handshake, then the read+heartbeat loop
    async fn run_attempt(
        &mut self,
        transport: &mut dyn Transport,
        backoff: &mut Backoff,
    ) -> AttemptEnd {
        let mut shutdown = self.shutdown_rx.clone();
        let first_frame = tokio::select! {
            frame = tokio::time::timeout(HELLO_TIMEOUT, transport.recv()) => frame,
            _ = shutdown.changed() => return AttemptEnd::Shutdown,
        };
        let hello = match first_frame {
            Ok(Some(Ok(Frame::Text(text)))) => match GatewayMessage::parse(&text) {
                Ok(msg) => match msg.as_hello() {
                    Some(hello) => hello,
                    None => {
                        tracing::warn!(op = %msg.op, "expected hello, got something else");
                        return AttemptEnd::Resume;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "first frame was not valid json");
                    return AttemptEnd::Resume;
                }
            },
            Ok(Some(Ok(Frame::Close { code, reason }))) => {
                return self.close_policy(code, &reason);
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "transport error before hello");
                return AttemptEnd::Resume;
            }
            Ok(None) => {
                tracing::warn!("transport closed before hello");
                return AttemptEnd::Resume;
            }
            Err(_) => {
                tracing::warn!("server never sent hello");
                return AttemptEnd::Resume;
            }
        };

        // the transport answered the protocol, stop escalating delays
        backoff.reset();
        let mut heartbeat = Heartbeat::new(hello.heartbeat_interval);

        if let Some(end) = self.send_handshake(transport).await {
            return end;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = transport
                        .send(Frame::Close { code: Some(1000), reason: "client shutdown".into() })
                        .await;
                    return AttemptEnd::Shutdown;
                }
                _ = heartbeat.due() => {
                    if !heartbeat.beat() {
                        tracing::warn!(seq = self.seq, "heartbeat never acknowledged, dropping zombie connection");
                        return AttemptEnd::Resume;
                    }
                    if let Some(end) = self.send_heartbeat(transport).await {
                        return end;
                    }
                }
                frame = transport.recv() => match frame {
                    Some(Ok(Frame::Text(text))) => {
                        if let Some(end) = self.handle_frame(transport, &mut heartbeat, &text).await {
                            return end;
                        }
                    }
                    Some(Ok(Frame::Close { code, reason })) => {
                        return self.close_policy(code, &reason);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "transport error in read loop");
                        return AttemptEnd::Resume;
                    }
                    None => {
                        tracing::warn!("transport closed abruptly");
                        return AttemptEnd::Resume;
                    }
                }
            }
        }
    }

    /// Send identify (fresh) or resume (existing session)
    async fn send_handshake(&mut self, transport: &mut dyn Transport) -> Option<AttemptEnd> {
        let message = if let Some(session) = &self.session {
            tracing::debug!(session = %session.id, seq = self.seq, "resuming session");
            GatewayMessage::resume(&ResumePayload {
                token: self.config.token.clone(),
                session_id: session.id.clone(),
                seq: self.seq,
            })
        } else {
            tracing::debug!(shard = self.config.gateway.shard_id, "identifying fresh session");
            GatewayMessage::identify(&IdentifyPayload {
                token: self.config.token.clone(),
                intents: self.config.intents,
                properties: IdentifyProperties::default(),
                shard: Some(ShardInfo(
                    self.config.gateway.shard_id,
                    self.config.gateway.shard_total,
                )),
                large_threshold: Some(self.config.gateway.large_threshold),
            })
        };
        self.send_message(transport, message).await
    }

    async fn send_heartbeat(&mut self, transport: &mut dyn Transport) -> Option<AttemptEnd> {
        let seq = (self.seq > 0).then_some(self.seq);
        tracing::trace!(seq = ?seq, "heartbeat");
        self.send_message(transport, Ok(GatewayMessage::heartbeat(seq)))
            .await
    }

    async fn send_message(
        &mut self,
        transport: &mut dyn Transport,
        message: Result<GatewayMessage, serde_json::Error>,
    ) -> Option<AttemptEnd> {
        let json = match message.and_then(|m| m.to_json()) {
            Ok(json) => json,
            Err(e) => return Some(AttemptEnd::Fatal(GatewayError::Decode(e))),
        };
        match transport.send(Frame::Text(json)).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                Some(AttemptEnd::Resume)
            }
        }
    }

    /// Route one inbound text frame
    async fn handle_frame(
        &mut self,
        transport: &mut dyn Transport,
        heartbeat: &mut Heartbeat,
        text: &str,
    ) -> Option<AttemptEnd> {
        let message = match GatewayMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame dropped");
                return None;
            }
        };

        match message.op {
            OpCode::Dispatch => {
                if let Some(s) = message.s {
                    self.seq = s;
                }
                let (name, data) = message.as_dispatch()?;
                let event = match Event::parse(name, data) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(event = name, error = %e, "dispatch payload failed to decode");
                        return None;
                    }
                };
                self.on_dispatch(event);
                None
            }
            OpCode::Heartbeat => {
                // server asked for an immediate beat
                self.send_heartbeat(transport).await
            }
            OpCode::HeartbeatAck => {
                heartbeat.ack();
                None
            }
            OpCode::Reconnect => {
                tracing::info!("server requested reconnect");
                Some(AttemptEnd::Resume)
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                if resumable {
                    tracing::info!("session invalidated, resume allowed");
                    Some(AttemptEnd::Resume)
                } else {
                    tracing::warn!("session invalidated, fresh identify required");
                    Some(AttemptEnd::Reidentify)
                }
            }
            other => {
                tracing::debug!(op = %other, "ignoring unexpected op");
                None
            }
        }
    }

    /// Apply one decoded dispatch event: session bookkeeping, cache, handlers
    fn on_dispatch(&mut self, event: Event) {
        match &event {
            Event::Ready(ready) => {
                self.session = Some(Session {
                    id: ready.session_id.clone(),
                    resume_url: ready.resume_gateway_url.clone(),
                });
                self.set_state(ConnectionState::Connected);
                let _ = self.ready_tx.send(true);
                tracing::info!(
                    session = %ready.session_id,
                    guilds = ready.guilds.len(),
                    "session established"
                );
                self.dispatcher.dispatch(Event::GatewayConnected);
            }
            Event::Resumed => {
                self.set_state(ConnectionState::Connected);
                let _ = self.ready_tx.send(true);
                tracing::info!(seq = self.seq, "session resumed");
                self.dispatcher.dispatch(Event::GatewayConnected);
            }
            _ => {}
        }

        if let Some(cache_event) = event.to_cache_event() {
            self.cache.apply(&cache_event);
        }
        self.dispatcher.dispatch(event);
    }

    /// The one place close codes are interpreted
    fn close_policy(&self, code: Option<u16>, reason: &str) -> AttemptEnd {
        let Some(raw) = code else {
            tracing::info!("closed without a code");
            return AttemptEnd::Resume;
        };
        match CloseCode::from_u16(raw) {
            // non-protocol codes (1000, 1001, ...) are transport-level drops
            None => {
                tracing::info!(code = raw, reason, "closed with non-protocol code");
                AttemptEnd::Resume
            }
            Some(close_code) if !close_code.should_reconnect() => {
                tracing::error!(code = %close_code, reason, "server refused the connection");
                AttemptEnd::Fatal(GatewayError::FatalClose(close_code))
            }
            Some(close_code) if close_code.can_resume() => {
                tracing::warn!(code = %close_code, reason, "closed, session still resumable");
                AttemptEnd::Resume
            }
            Some(close_code) => {
                tracing::warn!(code = %close_code, reason, "closed, session lost");
                AttemptEnd::Reidentify
            }
        }
    }

    /// Sleep for `delay`, cut short by shutdown; true when shutting down
    async fn sleep_or_shutdown(&mut self, delay: Duration) -> bool {
        let mut shutdown = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = shutdown.changed() => true,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            tracing::debug!(state = %state, "connection state changed");
            let _ = self.state_tx.send(state);
        }
    }
}
