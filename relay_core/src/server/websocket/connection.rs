//! WebSocket-backed [`Connection`]

use crate::connection::{Connection, ConnectionId};
use crate::error::RelayError;
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outbound half of an accepted socket.
///
/// Frames are queued here and drained by [`write_loop`]; the queued byte
/// count is what backpressure decisions look at.
pub struct WsConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    buffered: Arc<AtomicUsize>,
    closed: CancellationToken,
}

/// Receiving end handed to the writer task
pub struct Outbox {
    frames: mpsc::UnboundedReceiver<String>,
    buffered: Arc<AtomicUsize>,
    closed: CancellationToken,
}

impl WsConnection {
    pub fn new() -> (Self, Outbox) {
        let (outbound, frames) = mpsc::unbounded_channel();
        let buffered = Arc::new(AtomicUsize::new(0));
        let closed = CancellationToken::new();
        let conn = Self {
            id: ConnectionId::new(),
            outbound,
            buffered: buffered.clone(),
            closed: closed.clone(),
        };
        let outbox = Outbox {
            frames,
            buffered,
            closed,
        };
        (conn, outbox)
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Resolves once either half of the socket has shut down
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }

    fn buffered_bytes(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    fn write(&self, payload: String) -> Result<(), RelayError> {
        let len = payload.len();
        self.buffered.fetch_add(len, Ordering::SeqCst);
        if self.outbound.send(payload).is_err() {
            self.buffered.fetch_sub(len, Ordering::SeqCst);
            self.closed.cancel();
            return Err(RelayError::ConnectionClosed(self.id.to_string()));
        }
        Ok(())
    }
}

/// Time allowed for the closing handshake once the connection is done
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Drain queued frames into the socket, pinging while idle.
///
/// A peer that stops reading can park a write forever, so every write is
/// raced against the close signal.
pub async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbox: Outbox,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval(ping_interval);
    ping.tick().await; // first tick is immediate

    loop {
        let (message, len) = tokio::select! {
            _ = outbox.closed.cancelled() => break,
            frame = outbox.frames.recv() => {
                let Some(frame) = frame else { break };
                let len = frame.len();
                (Message::Text(frame.into()), len)
            }
            _ = ping.tick() => (Message::Ping(bytes::Bytes::new()), 0),
        };

        let result = tokio::select! {
            result = sink.send(message) => result,
            _ = outbox.closed.cancelled() => break,
        };
        outbox.buffered.fetch_sub(len, Ordering::SeqCst);
        if let Err(e) = result {
            tracing::debug!("WebSocket write failed: {}", e);
            break;
        }
    }

    outbox.closed.cancel();
    if tokio::time::timeout(CLOSE_GRACE, sink.close()).await.is_err() {
        tracing::debug!("Peer did not take the close frame in time");
    }
}
