//! Gateway session manager.
//!
//! One task owns all session state and is driven by three inputs: commands
//! from [`GatewayHandle`]s, socket events forwarded by the current session's
//! reader task, and its own timers (heartbeat, pending reconnect). Every
//! connection attempt gets a new generation number; socket events tagged with
//! an older generation are dropped, so a torn-down socket can never act on
//! the session that replaced it.

use std::{fmt, sync::Arc, time::Duration};

use {
    breadcord_auth::Credential,
    breadcord_config::GatewayConfig,
    breadcord_protocol::{self as protocol, GatewayFrame, Hello, IdentifyProperties, Opcode},
    serde::Serialize,
    tokio::{
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
        time::{Instant, sleep_until},
    },
    tracing::{debug, info, trace, warn},
};

use crate::{
    backoff::{Backoff, ReconnectPolicy},
    bridge::{BridgeEvent, BridgeSender},
    error::{Error, Result},
    jitter::{JitterSource, RandomJitter},
    transport::{FrameSink, SocketEvent, Transport},
};

// ── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingHello,
    Identifying,
    Active,
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting_hello",
            Self::Identifying => "identifying",
            Self::Active => "active",
            Self::Reconnecting => "reconnecting",
        })
    }
}

// ── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub url: String,
    pub properties: IdentifyProperties,
    pub invalid_session_delay: Duration,
    pub reconnect: ReconnectPolicy,
}

impl GatewayOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            url: config.url.clone(),
            properties: IdentifyProperties {
                os: config.os.clone(),
                browser: config.browser.clone(),
                device: config.device.clone(),
            },
            invalid_session_delay: Duration::from_millis(config.invalid_session_delay_ms),
            reconnect: ReconnectPolicy::from_config(config),
        }
    }
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

// ── Handle ──────────────────────────────────────────────────────────────────

enum Command {
    Reconnect {
        fresh: bool,
        ack: oneshot::Sender<()>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Cloneable control handle for a running session manager.
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl GatewayHandle {
    /// Tear down the current socket and connect again, keeping the sequence.
    /// Resolves once the new socket has been opened (or failed to open).
    pub async fn reconnect(&self) -> Result<()> {
        self.request(|ack| Command::Reconnect { fresh: false, ack })
            .await
    }

    /// Like [`GatewayHandle::reconnect`] but discards the sequence.
    pub async fn reconnect_fresh(&self) -> Result<()> {
        self.request(|ack| Command::Reconnect { fresh: true, ack })
            .await
    }

    /// Close the socket and stop the manager task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|ack| Command::Shutdown { ack }).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<()>) -> Command) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands.send(make(ack)).map_err(|_| Error::Stopped)?;
        done.await.map_err(|_| Error::Stopped)
    }
}

impl fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("state", &self.state())
            .finish()
    }
}

// ── Manager ─────────────────────────────────────────────────────────────────

/// Builder for the session manager task.
pub struct GatewayManager {
    options: GatewayOptions,
    credential: Credential,
    transport: Arc<dyn Transport>,
    jitter: Arc<dyn JitterSource>,
    bridge: BridgeSender,
}

impl GatewayManager {
    pub fn new(
        options: GatewayOptions,
        credential: Credential,
        transport: Arc<dyn Transport>,
        bridge: BridgeSender,
    ) -> Self {
        Self {
            options,
            credential,
            transport,
            jitter: Arc::new(RandomJitter),
            bridge,
        }
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Spawn the manager task. It connects immediately.
    pub fn spawn(self) -> (GatewayHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);

        let actor = Actor {
            backoff: Backoff::new(self.options.reconnect),
            options: self.options,
            credential: self.credential,
            transport: self.transport,
            jitter: self.jitter,
            bridge: self.bridge,
            state: state_tx,
            commands: command_rx,
            inbound_tx,
            inbound_rx,
            generation: 0,
            session: None,
            sequence: None,
            heartbeat_interval: None,
            next_heartbeat: None,
            last_heartbeat_sent: None,
            pending_reconnect: None,
        };
        let task = tokio::spawn(actor.run());

        (
            GatewayHandle {
                commands: command_tx,
                state: state_rx,
            },
            task,
        )
    }
}

// ── Actor ───────────────────────────────────────────────────────────────────

struct Inbound {
    generation: u64,
    event: SocketEvent,
}

struct Session {
    generation: u64,
    sink: Box<dyn FrameSink>,
    reader: JoinHandle<()>,
    open: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingReconnect {
    at: Instant,
    fresh: bool,
}

struct Actor {
    options: GatewayOptions,
    credential: Credential,
    transport: Arc<dyn Transport>,
    jitter: Arc<dyn JitterSource>,
    bridge: BridgeSender,
    state: watch::Sender<SessionState>,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    generation: u64,
    session: Option<Session>,
    sequence: Option<u64>,
    heartbeat_interval: Option<Duration>,
    next_heartbeat: Option<Instant>,
    last_heartbeat_sent: Option<Instant>,
    pending_reconnect: Option<PendingReconnect>,
    backoff: Backoff,
}

fn encode<T: Serialize>(frame: &T) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Actor {
    async fn run(mut self) {
        self.connect().await;

        loop {
            let heartbeat_at = self.next_heartbeat;
            let reconnect_at = self.pending_reconnect.map(|p| p.at);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect { fresh, ack }) => {
                        self.reconnect(fresh).await;
                        let _ = ack.send(());
                    },
                    Some(Command::Shutdown { ack }) => {
                        self.stop().await;
                        let _ = ack.send(());
                        break;
                    },
                    None => {
                        debug!("all gateway handles dropped");
                        self.stop().await;
                        break;
                    },
                },
                Some(inbound) = self.inbound_rx.recv() => self.on_inbound(inbound).await,
                () = sleep_until_opt(heartbeat_at) => self.on_heartbeat_due().await,
                () = sleep_until_opt(reconnect_at) => {
                    let fresh = self.pending_reconnect.take().is_some_and(|p| p.fresh);
                    self.reconnect(fresh).await;
                },
            }
        }
        info!("gateway session manager stopped");
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "gateway state");
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Drop timers and close the current socket, if any. Idempotent.
    async fn teardown(&mut self) {
        self.next_heartbeat = None;
        self.heartbeat_interval = None;
        self.last_heartbeat_sent = None;
        self.pending_reconnect = None;

        if let Some(mut session) = self.session.take() {
            session.reader.abort();
            if session.open
                && let Err(e) = session.sink.close().await
            {
                debug!(generation = session.generation, error = %e, "socket close failed");
            }
        }
    }

    async fn connect(&mut self) {
        self.teardown().await;
        self.generation += 1;
        let generation = self.generation;
        self.set_state(SessionState::Connecting);
        info!(url = %self.options.url, generation, "connecting to gateway");

        match self.transport.connect(&self.options.url).await {
            Ok((sink, mut stream)) => {
                let tx = self.inbound_tx.clone();
                let reader = tokio::spawn(async move {
                    loop {
                        let event = stream.next_event().await;
                        let closed = matches!(event, SocketEvent::Closed { .. });
                        if tx.send(Inbound { generation, event }).is_err() || closed {
                            break;
                        }
                    }
                });
                self.session = Some(Session {
                    generation,
                    sink,
                    reader,
                    open: true,
                });
                self.set_state(SessionState::AwaitingHello);
            },
            Err(e) => {
                warn!(generation, error = %e, "gateway connect failed");
                self.on_closed(None);
            },
        }
    }

    async fn reconnect(&mut self, fresh: bool) {
        info!(fresh, "reconnecting to gateway");
        self.set_state(SessionState::Reconnecting);
        if fresh {
            self.sequence = None;
        }
        self.connect().await;
    }

    async fn stop(&mut self) {
        self.teardown().await;
        self.set_state(SessionState::Disconnected);
    }

    fn schedule_reconnect(&mut self, delay: Duration, fresh: bool) {
        let at = Instant::now() + delay;
        let pending = match self.pending_reconnect.take() {
            Some(p) => PendingReconnect {
                at: p.at.min(at),
                fresh: p.fresh || fresh,
            },
            None => PendingReconnect { at, fresh },
        };
        debug!(
            delay_ms = u64::try_from(pending.at.saturating_duration_since(Instant::now()).as_millis())
                .unwrap_or(u64::MAX),
            fresh = pending.fresh,
            "reconnect scheduled"
        );
        self.pending_reconnect = Some(pending);
    }

    // ── Socket events ───────────────────────────────────────────────────────

    async fn on_inbound(&mut self, inbound: Inbound) {
        let current = self
            .session
            .as_ref()
            .is_some_and(|s| s.generation == inbound.generation);
        if !current {
            trace!(generation = inbound.generation, "ignoring event from a stale socket");
            return;
        }

        match inbound.event {
            SocketEvent::Text(text) => match GatewayFrame::decode(&text) {
                Ok(frame) => self.on_frame(frame).await,
                Err(e) => debug!(error = %e, "dropping malformed gateway frame"),
            },
            SocketEvent::Error(e) => warn!(error = %e, "gateway socket error"),
            SocketEvent::Closed { code } => {
                info!(?code, "gateway socket closed");
                self.on_closed(code);
            },
        }
    }

    fn on_closed(&mut self, code: Option<u16>) {
        if let Some(session) = self.session.as_mut() {
            session.open = false;
        }
        self.next_heartbeat = None;
        let delay = self.backoff.next_delay(self.jitter.as_ref());
        trace!(?code, attempt = self.backoff.attempt(), "scheduling reconnect after close");
        self.schedule_reconnect(delay, false);
        self.set_state(SessionState::Reconnecting);
    }

    async fn on_frame(&mut self, frame: GatewayFrame) {
        trace!(op = frame.op, t = ?frame.t, s = ?frame.s, "gateway frame");

        match frame.opcode() {
            Opcode::Hello => match frame.hello() {
                Ok(hello) => self.on_hello(hello).await,
                Err(e) => warn!(error = %e, "invalid HELLO payload"),
            },
            Opcode::HeartbeatAck => self.on_heartbeat_ack(),
            Opcode::Heartbeat => {
                debug!("gateway requested a heartbeat");
                self.send_heartbeat().await;
            },
            Opcode::Reconnect => {
                info!("gateway requested a reconnect");
                self.bridge.send(BridgeEvent::GatewayMessage(frame));
                self.reconnect(false).await;
                return;
            },
            Opcode::InvalidSession => {
                let resumable = frame.resumable();
                info!(resumable, "gateway invalidated the session");
                if !resumable {
                    self.sequence = None;
                }
                self.schedule_reconnect(self.options.invalid_session_delay, !resumable);
            },
            Opcode::Dispatch | Opcode::Identify | Opcode::Other(_) => {
                if let Some(seq) = frame.s {
                    self.sequence = Some(seq);
                }
            },
        }

        self.bridge.send(BridgeEvent::GatewayMessage(frame));
    }

    async fn on_hello(&mut self, hello: Hello) {
        let interval = Duration::from_millis(hello.heartbeat_interval);
        info!(heartbeat_interval_ms = hello.heartbeat_interval, "gateway hello");
        self.backoff.reset();

        if interval.is_zero() {
            warn!("gateway sent a zero heartbeat interval, heartbeats disabled");
            self.heartbeat_interval = None;
            self.next_heartbeat = None;
        } else {
            let first = self.jitter.jitter(interval);
            self.heartbeat_interval = Some(interval);
            self.next_heartbeat = Some(Instant::now() + first);
            debug!(
                first_ms = u64::try_from(first.as_millis()).unwrap_or(u64::MAX),
                "first heartbeat scheduled"
            );
        }

        self.set_state(SessionState::Identifying);
        let identify = protocol::identify(
            self.credential.expose(),
            self.options.properties.clone(),
        );
        match encode(&identify) {
            Ok(text) => {
                if self.send(text).await {
                    info!(credential = %self.credential, "identify sent");
                }
            },
            Err(e) => warn!(error = %e, "failed to encode identify"),
        }
        self.set_state(SessionState::Active);
    }

    // ── Heartbeats ──────────────────────────────────────────────────────────

    async fn on_heartbeat_due(&mut self) {
        let due = self.next_heartbeat.take();
        self.send_heartbeat().await;
        // Schedule from the previous deadline so beats stay exactly one
        // interval apart.
        if let (Some(due), Some(interval)) = (due, self.heartbeat_interval) {
            self.next_heartbeat = Some(due + interval);
        }
    }

    async fn send_heartbeat(&mut self) {
        let text = match encode(&protocol::heartbeat(self.sequence)) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode heartbeat");
                return;
            },
        };
        let sent_at = Instant::now();
        if self.send(text).await {
            self.last_heartbeat_sent = Some(sent_at);
            trace!(seq = ?self.sequence, "heartbeat sent");
        }
    }

    fn on_heartbeat_ack(&mut self) {
        let Some(sent) = self.last_heartbeat_sent else {
            debug!("heartbeat ack without a recorded send, ignoring");
            return;
        };
        let ping_ms = u64::try_from(Instant::now().saturating_duration_since(sent).as_millis())
            .unwrap_or(u64::MAX);
        debug!(ping_ms, "heartbeat ack");
        self.bridge.send(BridgeEvent::GatewayPing { ping_ms });
    }

    /// Write a text frame to the open socket. Returns whether it was sent.
    async fn send(&mut self, text: String) -> bool {
        let Some(session) = self.session.as_mut().filter(|s| s.open) else {
            debug!("socket not open, frame not sent");
            return false;
        };
        let result = session.sink.send_text(text).await;
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "gateway send failed");
                false
            },
        }
    }
}
