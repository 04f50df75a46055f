//! Session manager behaviour against an in-memory transport on paused time.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    breadcord_auth::Credential,
    breadcord_gateway::{
        BridgeEvent, Error, FixedJitter, FrameSink, FrameStream, GatewayHandle, GatewayManager,
        GatewayOptions, ReconnectPolicy, Result, SessionState, SocketEvent, Transport, UiBridge,
        channel,
    },
    rstest::rstest,
    serde_json::{Value, json},
    tokio::{sync::mpsc, task::JoinHandle, time::Instant},
};

// ── Fake transport ──────────────────────────────────────────────────────────

/// Server end of one fake socket.
struct FakeServer {
    incoming: mpsc::UnboundedSender<SocketEvent>,
    outgoing: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    fn send(&self, frame: Value) {
        let _ = self.incoming.send(SocketEvent::Text(frame.to_string()));
    }

    fn send_raw(&self, text: &str) {
        let _ = self.incoming.send(SocketEvent::Text(text.to_string()));
    }

    fn close(&self, code: u16) {
        let _ = self.incoming.send(SocketEvent::Closed { code: Some(code) });
    }

    fn hello(&self, interval_ms: u64) {
        self.send(json!({"op": 10, "d": {"heartbeat_interval": interval_ms}, "s": null, "t": null}));
    }

    fn dispatch(&self, name: &str, seq: u64) {
        self.send(json!({"op": 0, "d": {}, "s": seq, "t": name}));
    }

    /// Next frame the client wrote.
    async fn recv(&mut self) -> Value {
        let text = self.outgoing.recv().await.expect("client frame");
        serde_json::from_str(&text).unwrap()
    }
}

#[derive(Clone)]
struct FakeTransport {
    accepted: mpsc::UnboundedSender<FakeServer>,
    live: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
}

impl FakeTransport {
    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, _url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::message("connection refused"));
        }

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.live.fetch_add(1, Ordering::SeqCst);
        let _ = self.accepted.send(FakeServer {
            incoming: in_tx,
            outgoing: out_rx,
        });
        Ok((
            Box::new(FakeSink {
                tx: out_tx,
                live: Arc::clone(&self.live),
                open: true,
            }),
            Box::new(FakeStream { rx: in_rx }),
        ))
    }
}

struct FakeSink {
    tx: mpsc::UnboundedSender<String>,
    live: Arc<AtomicUsize>,
    open: bool,
}

impl FakeSink {
    fn mark_closed(&mut self) {
        if self.open {
            self.open = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        if !self.open {
            return Err(Error::SocketClosed);
        }
        self.tx.send(text).map_err(|_| Error::SocketClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.mark_closed();
        Ok(())
    }
}

impl Drop for FakeSink {
    fn drop(&mut self) {
        self.mark_closed();
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<SocketEvent>,
}

#[async_trait]
impl FrameStream for FakeStream {
    async fn next_event(&mut self) -> SocketEvent {
        self.rx
            .recv()
            .await
            .unwrap_or(SocketEvent::Closed { code: None })
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    handle: GatewayHandle,
    task: JoinHandle<()>,
    servers: mpsc::UnboundedReceiver<FakeServer>,
    ui: UiBridge,
    transport: FakeTransport,
}

fn start_with(options: GatewayOptions, jitter: FixedJitter, failures: usize) -> Harness {
    let (host, ui) = channel();
    let (accepted, servers) = mpsc::unbounded_channel();
    let transport = FakeTransport {
        accepted,
        live: Arc::new(AtomicUsize::new(0)),
        connects: Arc::new(AtomicUsize::new(0)),
        failures: Arc::new(AtomicUsize::new(failures)),
    };
    let (handle, task) = GatewayManager::new(
        options,
        Credential::new("tok.abc.def"),
        Arc::new(transport.clone()),
        host.sender(),
    )
    .with_jitter(Arc::new(jitter))
    .spawn();
    Harness {
        handle,
        task,
        servers,
        ui,
        transport,
    }
}

fn start(jitter_ms: u64) -> Harness {
    start_with(GatewayOptions::default(), FixedJitter::from_millis(jitter_ms), 0)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

impl Harness {
    async fn next_server(&mut self) -> FakeServer {
        self.servers.recv().await.expect("connection attempt")
    }

    /// Connect, say hello and consume the identify frame.
    async fn identified(&mut self, interval_ms: u64) -> FakeServer {
        let mut server = self.next_server().await;
        server.hello(interval_ms);
        let identify = server.recv().await;
        assert_eq!(identify["op"], 2);
        server
    }

    async fn next_ping(&mut self) -> u64 {
        loop {
            if let BridgeEvent::GatewayPing { ping_ms } = self.ui.recv().await.unwrap() {
                return ping_ms;
            }
        }
    }

    /// Bridge events up to and including the dispatch named `marker`.
    async fn events_until(&mut self, marker: &str) -> Vec<BridgeEvent> {
        let mut out = Vec::new();
        loop {
            let event = self.ui.recv().await.unwrap();
            let done = matches!(&event, BridgeEvent::GatewayMessage(f) if f.t.as_deref() == Some(marker));
            out.push(event);
            if done {
                return out;
            }
        }
    }

    async fn wait_for_state(&self, want: SessionState) {
        let mut rx = self.handle.watch_state();
        rx.wait_for(|s| *s == want).await.unwrap();
    }
}

// ── Handshake and heartbeats ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hello_triggers_identify_and_jittered_heartbeats() {
    let mut h = start(250);
    let mut server = h.next_server().await;
    let t0 = Instant::now();

    server.hello(1_000);
    let identify = server.recv().await;
    assert_eq!(t0.elapsed(), Duration::ZERO);
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "tok.abc.def");
    assert_eq!(identify["d"]["properties"]["browser"], "Breadcord");
    assert_eq!(identify["d"]["properties"]["device"], "Breadcord");
    assert_eq!(h.handle.state(), SessionState::Active);

    let beat = server.recv().await;
    assert_eq!(beat, json!({"op": 1, "d": null}));
    assert_eq!(t0.elapsed(), ms(250));
    assert!(t0.elapsed() < ms(1_000));

    server.dispatch("MESSAGE_CREATE", 5);
    let beat = server.recv().await;
    assert_eq!(beat, json!({"op": 1, "d": 5}));
    assert_eq!(t0.elapsed(), ms(1_250));

    server.recv().await;
    assert_eq!(t0.elapsed(), ms(2_250));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_request_is_answered_out_of_cycle() {
    let mut h = start(250);
    let mut server = h.identified(1_000).await;
    let t0 = Instant::now();

    server.send(json!({"op": 1}));
    server.recv().await;
    assert_eq!(t0.elapsed(), Duration::ZERO);

    // The periodic schedule is unchanged.
    server.recv().await;
    assert_eq!(t0.elapsed(), ms(250));
}

#[tokio::test(start_paused = true)]
async fn latency_is_ack_minus_last_send() {
    let mut h = start(250);
    let mut server = h.identified(1_000).await;
    server.recv().await;

    tokio::time::advance(ms(40)).await;
    server.send(json!({"op": 11}));
    assert_eq!(h.next_ping().await, 40);
}

#[tokio::test(start_paused = true)]
async fn ack_without_a_send_is_ignored() {
    let mut h = start(250);
    let server = h.identified(1_000).await;

    server.send(json!({"op": 11}));
    server.dispatch("MARKER", 1);
    let events = h.events_until("MARKER").await;
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, BridgeEvent::GatewayPing { .. }))
    );
}

// ── Bridge publication ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn every_decoded_frame_is_published_and_garbage_is_dropped() {
    let mut h = start(250);
    let mut server = h.next_server().await;

    server.send_raw("not json at all");
    server.hello(1_000);
    server.recv().await;
    server.send_raw("{\"op\": ");
    server.dispatch("READY", 1);

    let events = h.events_until("READY").await;
    let ops: Vec<u64> = events
        .iter()
        .map(|e| match e {
            BridgeEvent::GatewayMessage(f) => f.op,
            BridgeEvent::GatewayPing { .. } => u64::MAX,
        })
        .collect();
    assert_eq!(ops, vec![10, 0]);
}

// ── Reconnects ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_reconnects_keep_one_live_socket() {
    let mut h = start(250);
    let _first = h.next_server().await;
    assert_eq!(h.transport.live(), 1);

    for _ in 0..3 {
        h.handle.reconnect().await.unwrap();
        assert_eq!(h.transport.live(), 1);
    }

    let (a, b, c) = tokio::join!(
        h.handle.reconnect(),
        h.handle.reconnect_fresh(),
        h.handle.reconnect()
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(h.transport.live(), 1);
    assert_eq!(h.transport.connects(), 7);
}

#[tokio::test(start_paused = true)]
async fn close_reconnects_after_two_seconds_keeping_sequence() {
    let mut h = start(250);
    let server = h.identified(1_000).await;
    server.dispatch("MESSAGE_CREATE", 9);
    let t0 = Instant::now();
    server.close(1000);
    h.wait_for_state(SessionState::Reconnecting).await;

    let mut second = h.next_server().await;
    assert_eq!(t0.elapsed(), ms(2_000));

    second.hello(1_000);
    second.recv().await;
    assert_eq!(second.recv().await, json!({"op": 1, "d": 9}));
}

#[rstest]
#[case::resumable(true, Some(7))]
#[case::not_resumable(false, None)]
#[tokio::test(start_paused = true)]
async fn invalid_session_reconnects_after_delay(
    #[case] resumable: bool,
    #[case] expected_seq: Option<u64>,
) {
    let mut h = start(250);
    let server = h.identified(1_000).await;
    server.dispatch("MESSAGE_CREATE", 7);
    let t0 = Instant::now();
    server.send(json!({"op": 9, "d": resumable}));

    let mut second = h.next_server().await;
    assert_eq!(t0.elapsed(), ms(2_500));

    second.hello(1_000);
    second.recv().await;
    assert_eq!(
        second.recv().await,
        json!({"op": 1, "d": expected_seq})
    );
}

#[tokio::test(start_paused = true)]
async fn reconnect_opcode_reconnects_immediately() {
    let mut h = start(250);
    let server = h.identified(1_000).await;
    server.dispatch("MESSAGE_CREATE", 3);
    let t0 = Instant::now();
    server.send(json!({"op": 7}));

    let mut second = h.next_server().await;
    assert_eq!(t0.elapsed(), Duration::ZERO);
    assert_eq!(h.transport.live(), 1);

    second.hello(1_000);
    second.recv().await;
    assert_eq!(second.recv().await, json!({"op": 1, "d": 3}));
}

#[tokio::test(start_paused = true)]
async fn earlier_pending_reconnect_wins() {
    let mut h = start(250);
    let server = h.identified(1_000).await;
    let t0 = Instant::now();
    server.send(json!({"op": 9, "d": false}));
    server.close(4000);

    h.next_server().await;
    assert_eq!(t0.elapsed(), ms(2_000));
    assert_eq!(h.transport.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_connect_is_retried_like_a_close() {
    let t0 = Instant::now();
    let mut h = start_with(GatewayOptions::default(), FixedJitter::from_millis(250), 1);

    h.next_server().await;
    assert_eq!(t0.elapsed(), ms(2_000));
    assert_eq!(h.transport.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_grows_and_resets_on_hello() {
    let options = GatewayOptions {
        reconnect: ReconnectPolicy::Exponential {
            initial: ms(1_000),
            max: ms(60_000),
        },
        ..GatewayOptions::default()
    };
    // Jitter at the ceiling makes each delay equal to the ceiling.
    let t0 = Instant::now();
    let mut h = start_with(options, FixedJitter(Duration::MAX), 3);

    let mut server = h.next_server().await;
    assert_eq!(t0.elapsed(), ms(1_000 + 2_000 + 4_000));

    server.hello(10_000);
    server.recv().await;
    let t1 = Instant::now();
    server.close(1000);
    h.next_server().await;
    assert_eq!(t1.elapsed(), ms(1_000));
}

// ── Shutdown ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_socket_and_stops() {
    let mut h = start(250);
    let _server = h.identified(1_000).await;

    h.handle.shutdown().await.unwrap();
    assert_eq!(h.handle.state(), SessionState::Disconnected);
    assert_eq!(h.transport.live(), 0);
    h.task.await.unwrap();

    assert!(matches!(h.handle.reconnect().await, Err(Error::Stopped)));
}
