//! The connection seam between the relay engine and the transport.
//!
//! The engine only ever holds `Arc<dyn Connection>` handles; the transport
//! owns the socket and its lifecycle.

use crate::error::RelayError;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First group is plenty for log correlation
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// A bidirectional message channel owned by the transport
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn is_open(&self) -> bool;

    /// Bytes accepted by `write` but not yet handed to the socket
    fn buffered_bytes(&self) -> usize;

    /// Queue one text frame for delivery
    fn write(&self, payload: String) -> Result<(), RelayError>;
}

pub type ConnectionHandle = Arc<dyn Connection>;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory connection that records every written frame
    pub struct RecordingConnection {
        id: ConnectionId,
        open: AtomicBool,
        buffered: AtomicUsize,
        writes: Mutex<Vec<serde_json::Value>>,
    }

    impl RecordingConnection {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(),
                open: AtomicBool::new(true),
                buffered: AtomicUsize::new(0),
                writes: Mutex::new(Vec::new()),
            })
        }

        pub fn handle(self: &Arc<Self>) -> ConnectionHandle {
            self.clone()
        }

        pub fn close(&self) {
            self.open.store(false, Ordering::SeqCst);
        }

        pub fn set_buffered(&self, bytes: usize) {
            self.buffered.store(bytes, Ordering::SeqCst);
        }

        /// Every frame written so far, parsed as JSON
        pub fn sent(&self) -> Vec<serde_json::Value> {
            self.writes.lock().unwrap().clone()
        }

        pub fn sent_events(&self) -> Vec<String> {
            self.sent()
                .iter()
                .map(|msg| msg["event"].as_str().unwrap_or_default().to_string())
                .collect()
        }
    }

    impl Connection for RecordingConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn buffered_bytes(&self) -> usize {
            self.buffered.load(Ordering::SeqCst)
        }

        fn write(&self, payload: String) -> Result<(), RelayError> {
            let value = serde_json::from_str(&payload)?;
            self.writes.lock().unwrap().push(value);
            Ok(())
        }
    }
}
