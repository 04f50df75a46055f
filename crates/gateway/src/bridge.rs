//! The single channel between the host side (gateway, keyring) and the UI
//! side (caches, plugins).
//!
//! Host → UI traffic is fire-and-forget [`BridgeEvent`]s. The UI pump drains
//! them in order and publishes each one exactly once on the [`UiBuses`].
//! UI → host traffic is [`UiRequest`]s; only the reconnect request expects a
//! reply.

use std::sync::Arc;

use {
    breadcord_auth::{Credential, CredentialStore, redact},
    breadcord_common::EventBus,
    breadcord_protocol::{GatewayFrame, channels},
    tokio::{
        sync::{mpsc, oneshot},
        task::JoinHandle,
    },
    tracing::{Level, debug, error, info, trace, warn},
};

use crate::{
    error::{Error, Result},
    session::GatewayHandle,
};

// ── Messages ────────────────────────────────────────────────────────────────

/// Host → UI event.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    GatewayMessage(GatewayFrame),
    GatewayPing { ping_ms: u64 },
}

impl BridgeEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::GatewayMessage(_) => channels::GATEWAY_MESSAGE,
            Self::GatewayPing { .. } => channels::GATEWAY_PING,
        }
    }
}

/// UI → host request.
#[derive(Debug)]
pub enum UiRequest {
    /// Credential extracted by the UI; `None` when the user is not logged in.
    CredentialFound(Option<String>),
    Log { level: Level, message: String },
    Reconnect(oneshot::Sender<()>),
}

impl UiRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::CredentialFound(_) => channels::TOKEN_FOUND,
            Self::Log { .. } => channels::LOG,
            Self::Reconnect(_) => channels::GATEWAY_RECONNECT,
        }
    }
}

/// Create a connected host/UI bridge pair.
pub fn channel() -> (HostBridge, UiBridge) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    (
        HostBridge {
            sender: BridgeSender { tx: event_tx },
            requests: HostRequests { rx: request_rx },
        },
        UiBridge {
            events: event_rx,
            requester: UiRequester { tx: request_tx },
        },
    )
}

// ── Host side ───────────────────────────────────────────────────────────────

pub struct HostBridge {
    sender: BridgeSender,
    requests: HostRequests,
}

impl HostBridge {
    pub fn sender(&self) -> BridgeSender {
        self.sender.clone()
    }

    pub fn split(self) -> (BridgeSender, HostRequests) {
        (self.sender, self.requests)
    }
}

/// Cloneable host → UI emitter.
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl BridgeSender {
    pub fn send(&self, event: BridgeEvent) {
        let channel = event.channel();
        if self.tx.send(event).is_err() {
            trace!(channel, "bridge event dropped: UI side is gone");
        }
    }
}

/// Receiving end of UI → host requests.
pub struct HostRequests {
    rx: mpsc::UnboundedReceiver<UiRequest>,
}

impl HostRequests {
    pub async fn recv(&mut self) -> Option<UiRequest> {
        self.rx.recv().await
    }

    /// Serve requests until a usable credential is handed off and saved.
    ///
    /// Returns `None` when the UI side goes away first. Reconnect requests
    /// are acknowledged right away since no gateway is running yet.
    pub async fn wait_for_credential(
        &mut self,
        store: &Arc<dyn CredentialStore>,
    ) -> Option<Credential> {
        while let Some(request) = self.rx.recv().await {
            if let Some(credential) = handle_request(request, store, None).await {
                return Some(credential);
            }
        }
        None
    }

    /// Serve requests against a running gateway until the UI side goes away.
    pub async fn serve(mut self, store: Arc<dyn CredentialStore>, gateway: GatewayHandle) {
        while let Some(request) = self.rx.recv().await {
            if handle_request(request, &store, Some(&gateway)).await.is_some() {
                info!("new credential stored; it takes effect on the next start");
            }
        }
        debug!("UI request channel closed");
    }
}

async fn handle_request(
    request: UiRequest,
    store: &Arc<dyn CredentialStore>,
    gateway: Option<&GatewayHandle>,
) -> Option<Credential> {
    trace!(channel = request.channel(), "UI request");
    match request {
        UiRequest::CredentialFound(None) => {
            info!("not logged in, waiting for login");
            None
        },
        UiRequest::CredentialFound(Some(raw)) => {
            let raw = raw.trim();
            info!(credential = %redact(raw), "UI handed off a credential");
            match store.save(raw).await {
                Ok(()) => Credential::parse(raw),
                Err(e) => {
                    error!(error = %e, "failed to save credential");
                    None
                },
            }
        },
        UiRequest::Log { level, message } => {
            forward_log(level, &message);
            None
        },
        UiRequest::Reconnect(reply) => {
            match gateway {
                Some(gateway) => {
                    if let Err(e) = gateway.reconnect().await {
                        warn!(error = %e, "manual reconnect failed");
                    }
                },
                None => debug!("reconnect requested before the gateway started"),
            }
            let _ = reply.send(());
            None
        },
    }
}

fn forward_log(level: Level, message: &str) {
    match level {
        Level::ERROR => error!(target: "ui", "{message}"),
        Level::WARN => warn!(target: "ui", "{message}"),
        Level::INFO => info!(target: "ui", "{message}"),
        Level::DEBUG => debug!(target: "ui", "{message}"),
        _ => trace!(target: "ui", "{message}"),
    }
}

// ── UI side ─────────────────────────────────────────────────────────────────

pub struct UiBridge {
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    requester: UiRequester,
}

impl UiBridge {
    pub fn requester(&self) -> UiRequester {
        self.requester.clone()
    }

    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        self.events.recv().await
    }

    /// Spawn the task that republishes every bridge event on `buses`.
    pub fn pump(mut self, buses: UiBuses) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = self.events.recv().await {
                buses.publish(&event);
            }
            debug!("bridge closed, UI pump exiting");
        })
    }
}

/// Cloneable UI → host request sender.
#[derive(Debug, Clone)]
pub struct UiRequester {
    tx: mpsc::UnboundedSender<UiRequest>,
}

impl UiRequester {
    pub fn credential_found(&self, credential: Option<String>) -> Result<()> {
        self.send(UiRequest::CredentialFound(credential))
    }

    pub fn log(&self, level: Level, message: impl Into<String>) -> Result<()> {
        self.send(UiRequest::Log {
            level,
            message: message.into(),
        })
    }

    /// Ask the host to reconnect the gateway and wait for it to finish.
    pub async fn reconnect(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.send(UiRequest::Reconnect(reply))?;
        done.await.map_err(|_| Error::Stopped)
    }

    fn send(&self, request: UiRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| Error::Stopped)
    }
}

/// UI-side buses fed by the pump.
#[derive(Clone)]
pub struct UiBuses {
    /// Every decoded gateway frame, control frames included.
    pub gateway: EventBus<GatewayFrame>,
    /// Heartbeat round-trip latency in milliseconds.
    pub ping: EventBus<u64>,
}

impl Default for UiBuses {
    fn default() -> Self {
        Self {
            gateway: EventBus::named(channels::GATEWAY_MESSAGE),
            ping: EventBus::named(channels::GATEWAY_PING),
        }
    }
}

impl UiBuses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: &BridgeEvent) {
        match event {
            BridgeEvent::GatewayMessage(frame) => self.gateway.publish(frame),
            BridgeEvent::GatewayPing { ping_ms } => self.ping.publish(ping_ms),
        }
    }
}
