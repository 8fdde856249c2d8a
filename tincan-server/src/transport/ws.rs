//! The signaling socket: WebSocket upgrade on `/rtc`, one reader and one
//! writer task per connection.
//!
//! The reader hands every text line to the coordinator and enforces the
//! idle window; the writer drains the session's outbox and emits keep-alive
//! pings. Whichever side stops first aborts the other, and the connection
//! reports `closed` to the coordinator exactly once.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info};

use tincan_core::SessionId;

use crate::coordinator::CoordinatorHandle;
use crate::outbound::OutboundFrame;
use crate::AppState;

/// Close code for coordinator-initiated closes.
const CLOSE_NORMAL: u16 = 1000;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: AppState) {
    let session = SessionId::new();
    info!(%session, "signaling connection accepted");

    let (outbox_tx, outbox_rx) = mpsc::channel(app.config.outbox_capacity);
    app.peers.register(session, outbox_tx);

    let coordinator = app.coordinator.clone();
    // Registered before `opened`, so the greeting has an outbox to land in.
    coordinator.opened(session).await;

    let (sender, receiver) = socket.split();
    let mut send_task = tokio::spawn(write_loop(
        sender,
        outbox_rx,
        session,
        app.config.ping_period(),
    ));
    let mut recv_task = tokio::spawn(read_loop(
        receiver,
        session,
        coordinator.clone(),
        app.config.idle_window(),
    ));

    // Whichever half finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    app.peers.unregister(&session);
    coordinator.closed(session).await;
    info!(%session, "signaling connection closed");
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<OutboundFrame>,
    session: SessionId,
    ping_period: Duration,
) {
    let mut ping = interval_at(Instant::now() + ping_period, ping_period);
    loop {
        tokio::select! {
            frame = outbox.recv() => match frame {
                Some(OutboundFrame::Line(line)) => {
                    if sender.send(Message::Text(line)).await.is_err() {
                        debug!(%session, "send failed, tearing down");
                        break;
                    }
                }
                Some(OutboundFrame::Close { reason }) => {
                    let frame = CloseFrame {
                        code: CLOSE_NORMAL,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
                None => break,
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    session: SessionId,
    coordinator: CoordinatorHandle,
    idle_window: Duration,
) {
    loop {
        let message = match timeout(idle_window, receiver.next()).await {
            Err(_) => {
                info!(%session, "idle window elapsed, tearing down");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(error))) => {
                debug!(%session, %error, "receive error");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(line) => coordinator.inbound(session, line).await,
            Message::Binary(payload) => {
                debug!(%session, len = payload.len(), "ignoring binary frame");
            }
            // The framing layer answers pings; both directions simply count
            // as traffic for the idle window.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break,
        }
    }
}
