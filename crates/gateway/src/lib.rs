//! Gateway connectivity.
//!
//! - [`session`]: the session manager task (hello, identify, heartbeats,
//!   reconnects) behind a [`GatewayHandle`]
//! - [`transport`]: the socket seam and its WebSocket implementation
//! - [`bridge`]: the host ↔ UI channel and the UI-side buses

pub mod backoff;
pub mod bridge;
pub mod error;
pub mod jitter;
pub mod session;
pub mod transport;

pub use {
    backoff::{Backoff, ReconnectPolicy},
    bridge::{
        BridgeEvent, BridgeSender, HostBridge, HostRequests, UiBridge, UiBuses, UiRequest,
        UiRequester, channel,
    },
    error::{Error, Result},
    jitter::{FixedJitter, JitterSource, RandomJitter},
    session::{GatewayHandle, GatewayManager, GatewayOptions, SessionState},
    transport::{FrameSink, FrameStream, SocketEvent, Transport, WsTransport},
};
