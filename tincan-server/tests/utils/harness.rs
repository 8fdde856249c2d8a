use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Level;

use tincan_core::SessionId;
use tincan_server::{
    router, spawn_coordinator, AppState, OutboundFrame, ServerConfig,
};

/// How long a test waits for any single expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Window used when asserting that nothing arrives.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(200);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Binds an ephemeral port and serves the full router on it.
pub async fn spawn_server(config: ServerConfig) -> SocketAddr {
    let app = router(spawn_coordinator(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A peer wired straight to the coordinator through channel outboxes:
/// the socketless rig used for deterministic state-machine tests.
pub struct FakePeer {
    pub session: SessionId,
    state: AppState,
    outbox: mpsc::Receiver<OutboundFrame>,
}

/// Registers a channel-backed peer, announces it to the coordinator, and
/// consumes the connection greeting.
pub async fn open_peer(state: &AppState) -> FakePeer {
    let session = SessionId::new();
    let (tx, outbox) = mpsc::channel(state.config.outbox_capacity);
    state.peers.register(session, tx);
    state.coordinator.opened(session).await;

    let mut peer = FakePeer {
        session,
        state: state.clone(),
        outbox,
    };
    peer.expect_line("WAITING_FOR_CONNECTION_CODE").await;
    peer
}

impl FakePeer {
    pub async fn say(&self, line: &str) {
        self.state
            .coordinator
            .inbound(self.session, line.to_owned())
            .await;
    }

    /// Simulates the transport's teardown path.
    pub async fn hang_up(&self) {
        self.state.peers.unregister(&self.session);
        self.state.coordinator.closed(self.session).await;
        tokio::task::yield_now().await;
    }

    pub async fn recv_frame(&mut self) -> OutboundFrame {
        timeout(RECV_TIMEOUT, self.outbox.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("outbox closed while waiting for a frame")
    }

    pub async fn recv_line(&mut self) -> String {
        match self.recv_frame().await {
            OutboundFrame::Line(line) => line,
            other => panic!("expected a line, got {other:?}"),
        }
    }

    pub async fn expect_line(&mut self, expected: &str) {
        assert_eq!(self.recv_line().await, expected);
    }

    pub async fn expect_close(&mut self, reason: &str) {
        match self.recv_frame().await {
            OutboundFrame::Close { reason: actual } => {
                assert_eq!(actual, reason)
            }
            other => panic!("expected a close frame, got {other:?}"),
        }
    }

    /// Asserts nothing reaches this peer within [`SILENCE_WINDOW`].
    pub async fn expect_silence(&mut self) {
        match timeout(SILENCE_WINDOW, self.outbox.recv()).await {
            Err(_) => {}
            Ok(frame) => panic!("expected silence, got {frame:?}"),
        }
    }

    /// Drains buffered lines until the outbox shuts, returning what was
    /// still queued. Used after a forced drop.
    pub async fn expect_dropped(&mut self) -> Vec<String> {
        let mut drained = Vec::new();
        loop {
            let frame = timeout(RECV_TIMEOUT, self.outbox.recv())
                .await
                .expect("timed out waiting for the outbox to close");
            match frame {
                Some(OutboundFrame::Line(line)) => drained.push(line),
                Some(OutboundFrame::Close { .. }) | None => return drained,
            }
        }
    }
}
