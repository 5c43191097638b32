//! Shared relay state, built once at startup and handed to every connection
//! task behind an `Arc`.

use crate::config::RelayConfig;
use crate::connection::{Connection, ConnectionId};
use crate::messages::ServerMessage;
use crate::outbound::{self, Delivery};
use crate::registry::Registry;
use crate::stats::Stats;
use crate::tracker::TransferTracker;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RelayState {
    pub config: RelayConfig,
    pub registry: Registry,
    pub transfers: TransferTracker,
    pub stats: Stats,
    connection_count: AtomicUsize,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            transfers: TransferTracker::new(config.transfer_timeout),
            registry: Registry::new(),
            stats: Stats::default(),
            connection_count: AtomicUsize::new(0),
            config,
        }
    }

    /// Deliver `msg` to `conn` under the configured backpressure policy
    pub async fn send(&self, conn: &dyn Connection, msg: ServerMessage) -> Delivery {
        outbound::send(conn, &msg, &self.config.backpressure).await
    }

    /// Forget everything addressed to a closed connection
    pub async fn disconnect(&self, conn: ConnectionId) {
        let purged = self.registry.purge(conn).await;
        if !purged.is_empty() {
            tracing::debug!(
                "Purged {} share and {} origin code(s) of {}",
                purged.share_codes.len(),
                purged.origin_codes.len(),
                conn
            );
        }
        self.transfers.forget(&purged.origin_codes).await;
    }

    /// Reserve a connection slot; `None` when the server is full
    pub fn try_acquire_connection(&self) -> Option<ConnectionSlot<'_>> {
        self.connection_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < self.config.max_connections).then_some(current + 1)
            })
            .ok()
            .map(|_| ConnectionSlot { state: self })
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }
}

/// Releases its connection slot on drop
pub struct ConnectionSlot<'a> {
    state: &'a RelayState,
}

impl Drop for ConnectionSlot<'_> {
    fn drop(&mut self) {
        self.state.connection_count.fetch_sub(1, Ordering::SeqCst);
    }
}
