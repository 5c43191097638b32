//! Routes each inbound text frame to its handler.

use crate::codes::OriginCode;
use crate::connection::{Connection, ConnectionHandle};
use crate::messages::{InboundEvent, ServerMessage};
use crate::state::RelayState;
use crate::{pairing, tracker};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Handle one frame from `conn` to completion.
///
/// Malformed frames are dropped without a reply.
pub async fn dispatch(state: &RelayState, conn: &ConnectionHandle, text: &str) {
    let event = match InboundEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Dropping malformed frame from {}: {}", conn.id(), e);
            return;
        }
    };

    match event {
        InboundEvent::Heartbeat => {
            state
                .send(conn.as_ref(), ServerMessage::heartbeat(now_millis()))
                .await;
        }
        InboundEvent::RequestShareCode => pairing::request_share_code(state, conn).await,
        InboundEvent::ConnectionRequest { destination } => {
            pairing::connection_request(state, conn, destination).await
        }
        InboundEvent::ConnectionAccept { destination, files } => {
            pairing::connection_accept(state, conn, destination, files).await
        }
        InboundEvent::FileChunk { destination, chunk } => {
            tracker::handle_file_chunk(state, destination, chunk).await
        }
        InboundEvent::Relay {
            event,
            destination,
            data,
        } => relay(state, event, destination, data).await,
    }
}

/// Forward `{event, data}` untouched to whoever owns `destination`
async fn relay(
    state: &RelayState,
    event: String,
    destination: Option<OriginCode>,
    data: Option<Value>,
) {
    let Some(destination) = destination else {
        tracing::debug!("Dropping {} without destination", event);
        return;
    };
    match state.registry.origin_codes.lookup(&destination).await {
        Some(receiver) => {
            state
                .send(receiver.as_ref(), ServerMessage::relay(event, data))
                .await;
        }
        None => tracing::debug!("Dropping {} for unknown destination {}", event, destination),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
