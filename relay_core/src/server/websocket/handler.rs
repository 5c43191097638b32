//! WebSocket connection handler

use super::connection::{WsConnection, write_loop};
use crate::connection::{Connection, ConnectionHandle};
use crate::router;
use crate::state::RelayState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::StreamExt;
use std::sync::Arc;

/// Serve one upgraded socket until it closes.
///
/// Frames from a single socket are handled strictly one after another;
/// different sockets run concurrently.
pub async fn handle_socket(mut socket: WebSocket, state: Arc<RelayState>, client_ip: String) {
    let Some(_slot) = state.try_acquire_connection() else {
        tracing::warn!(
            "Rejecting connection from {}: {} connections open",
            client_ip,
            state.connection_count()
        );
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: "Too many concurrent connections".into(),
            })))
            .await;
        return;
    };

    let (sink, mut stream) = socket.split();
    let (conn, outbox) = WsConnection::new();
    let conn = Arc::new(conn);
    let handle: ConnectionHandle = conn.clone();
    let id = conn.id();

    let writer = tokio::spawn(write_loop(sink, outbox, state.config.ping_interval));

    tracing::info!("Connection {} established from {}", id, client_ip);

    loop {
        tokio::select! {
            _ = conn.closed() => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    router::dispatch(&state, &handle, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("WebSocket error on {}: {}", id, e);
                    break;
                }
                // Binary frames carry nothing for us; ping/pong is answered by the transport
                Some(Ok(_)) => {}
            }
        }
    }

    conn.close();
    state.disconnect(id).await;
    let _ = writer.await;

    tracing::info!("Connection {} from {} closed", id, client_ip);
}
