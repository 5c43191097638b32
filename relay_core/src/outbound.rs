//! Backpressure-aware delivery to a single connection.
//!
//! A send to a peer whose outbound queue is above the high-water mark waits
//! with exponential backoff until the queue drains, the peer goes away, or
//! the retry budget runs out. Callers treat every outcome as fire-and-forget;
//! [`Delivery`] exists for logging and tests.
//!
//! The wait happens inside the handler of the connection that produced the
//! message. Until it ends, that connection gets no other replies, HEARTBEAT
//! included: with the default policy one congested receiver holds its sender
//! up for about 53 s before the message is dropped.

use crate::config::BackpressureConfig;
use crate::connection::Connection;
use crate::messages::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Peer was closed before the write
    Closed,
    /// Peer stayed congested for the whole retry budget
    GaveUp,
    /// Serialization or the write itself failed
    Failed,
}

pub async fn send(
    conn: &dyn Connection,
    msg: &ServerMessage,
    policy: &BackpressureConfig,
) -> Delivery {
    if !conn.is_open() {
        return Delivery::Closed;
    }

    let payload = match serde_json::to_string(msg) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("Dropping unserializable message for {}: {}", conn.id(), e);
            return Delivery::Failed;
        }
    };

    let mut attempt = 0;
    while conn.buffered_bytes() > policy.high_water_mark {
        if attempt >= policy.max_retries {
            tracing::warn!(
                "Giving up on {} after {} deferred attempts ({} bytes buffered)",
                conn.id(),
                attempt,
                conn.buffered_bytes()
            );
            return Delivery::GaveUp;
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
        attempt += 1;
        if !conn.is_open() {
            return Delivery::Closed;
        }
    }

    match conn.write(payload) {
        Ok(()) => Delivery::Delivered,
        Err(e) => {
            tracing::debug!("Write to {} failed: {}", conn.id(), e);
            Delivery::Failed
        }
    }
}
