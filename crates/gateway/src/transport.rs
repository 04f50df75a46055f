//! Socket seam between the session manager and the network.
//!
//! The session manager only sees text frames and close notifications.
//! [`WsTransport`] is the production WebSocket implementation; tests inject
//! an in-memory transport.

use std::sync::Arc;

use {
    async_trait::async_trait,
    futures::{
        SinkExt, StreamExt,
        stream::{SplitSink, SplitStream},
    },
    tokio::net::TcpStream,
    tokio_tungstenite::{
        Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
        tungstenite::Message,
    },
    tracing::{debug, trace},
};

use crate::error::{Context, Result};

/// One event read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Text(String),
    /// The socket closed. No further events follow.
    Closed { code: Option<u16> },
    /// A read error. Implementations report `Closed` right after.
    Error(String),
}

/// Writer half of an open socket.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Reader half of an open socket.
#[async_trait]
pub trait FrameStream: Send {
    async fn next_event(&mut self) -> SocketEvent;
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)>;
}

// ── WebSocket ───────────────────────────────────────────────────────────────

type WsConn = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `tokio-tungstenite` transport trusting the platform root certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

fn build_tls_connector() -> Connector {
    // Both rustls providers are compiled in, so one must be picked explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut root_store = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = root_store.add(cert);
    }
    debug!(roots = root_store.len(), "loaded native root certificates");

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Connector::Rustls(Arc::new(config))
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        let (ws, _response) =
            connect_async_tls_with_config(url, None, false, Some(build_tls_connector()))
                .await
                .with_context(|| format!("failed to connect to {url}"))?;
        let (sink, stream) = ws.split();
        Ok((
            Box::new(WsSink { sink }),
            Box::new(WsStream {
                stream,
                errored: false,
            }),
        ))
    }
}

struct WsSink {
    sink: SplitSink<WsConn, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

struct WsStream {
    stream: SplitStream<WsConn>,
    errored: bool,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn next_event(&mut self) -> SocketEvent {
        if self.errored {
            return SocketEvent::Closed { code: None };
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return SocketEvent::Text(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    return SocketEvent::Closed {
                        code: frame.map(|f| u16::from(f.code)),
                    };
                },
                Some(Ok(other)) => {
                    // Ping/pong are answered by tungstenite; binary is unused.
                    trace!(kind = message_kind(&other), "ignoring non-text frame");
                },
                Some(Err(e)) => {
                    self.errored = true;
                    return SocketEvent::Error(e.to_string());
                },
                None => return SocketEvent::Closed { code: None },
            }
        }
    }
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

