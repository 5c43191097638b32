//! Chunked transfer bookkeeping.
//!
//! One [`TransferState`] per destination origin code, created by the first
//! chunk addressed to it. A state goes away when every declared chunk has
//! been seen, when its expiry timer fires, or when the destination
//! disconnects.

use crate::codes::OriginCode;
use crate::messages::{FileChunk, ServerMessage};
use crate::state::RelayState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct TransferState {
    pub total: u64,
    /// Distinct in-range chunk indices seen so far
    pub received: u64,
    pub file_name: String,
    seen: HashSet<u64>,
    /// Ties the expiry timer to this particular state
    generation: u64,
}

impl TransferState {
    fn new(total: u64, file_name: String, generation: u64) -> Self {
        Self {
            total,
            received: 0,
            file_name,
            seen: HashSet::new(),
            generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkProgress {
    InProgress { received: u64, total: u64 },
    Complete { file_name: String },
}

type TransferMap = HashMap<OriginCode, TransferState>;

pub struct TransferTracker {
    transfers: Arc<Mutex<TransferMap>>,
    next_generation: AtomicU64,
    timeout: Duration,
}

impl TransferTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            transfers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            timeout,
        }
    }

    /// Count a chunk for `destination`.
    ///
    /// Retransmitted indices and indices outside `[0, total)` do not advance
    /// the count. On completion the state is removed before returning.
    pub async fn record_chunk(&self, destination: &OriginCode, chunk: &FileChunk) -> ChunkProgress {
        let mut transfers = self.transfers.lock().await;

        let state = transfers.entry(destination.clone()).or_insert_with(|| {
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            self.schedule_expiry(destination.clone(), generation);
            tracing::debug!(
                "Tracking transfer of {} ({} chunks) to {}",
                chunk.file_name,
                chunk.total_chunks,
                destination
            );
            TransferState::new(chunk.total_chunks, chunk.file_name.clone(), generation)
        });

        if chunk.chunk_index < state.total && state.seen.insert(chunk.chunk_index) {
            state.received += 1;
        }

        if state.received == state.total && state.total > 0 {
            let file_name = state.file_name.clone();
            transfers.remove(destination);
            return ChunkProgress::Complete { file_name };
        }

        ChunkProgress::InProgress {
            received: state.received,
            total: state.total,
        }
    }

    fn schedule_expiry(&self, destination: OriginCode, generation: u64) {
        let transfers = Arc::clone(&self.transfers);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut transfers = transfers.lock().await;
            if transfers
                .get(&destination)
                .is_some_and(|state| state.generation == generation)
            {
                if let Some(state) = transfers.remove(&destination) {
                    tracing::info!(
                        "Transfer of {} to {} expired at {}/{} chunks",
                        state.file_name,
                        destination,
                        state.received,
                        state.total
                    );
                }
            }
        });
    }

    pub async fn get(&self, destination: &OriginCode) -> Option<TransferState> {
        self.transfers.lock().await.get(destination).cloned()
    }

    /// Drop any transfers addressed to `destinations`
    pub async fn forget(&self, destinations: &[OriginCode]) {
        if destinations.is_empty() {
            return;
        }
        let mut transfers = self.transfers.lock().await;
        for destination in destinations {
            transfers.remove(destination);
        }
    }

    pub async fn len(&self) -> usize {
        self.transfers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transfers.lock().await.is_empty()
    }
}

/// FILE_CHUNK: relay the chunk to its destination and report completion.
///
/// Chunks for an unknown destination are dropped without touching the
/// tracker.
pub async fn handle_file_chunk(
    state: &RelayState,
    destination: Option<OriginCode>,
    chunk: FileChunk,
) {
    let Some(destination) = destination else {
        tracing::debug!("Dropping FILE_CHUNK without destination");
        return;
    };
    let Some(receiver) = state.registry.origin_codes.lookup(&destination).await else {
        tracing::debug!("Dropping FILE_CHUNK for unknown destination {}", destination);
        return;
    };

    let progress = state.transfers.record_chunk(&destination, &chunk).await;

    state
        .send(receiver.as_ref(), ServerMessage::file_chunk(chunk))
        .await;

    if let ChunkProgress::Complete { file_name } = progress {
        tracing::info!("Transfer of {} to {} complete", file_name, destination);
        state
            .send(receiver.as_ref(), ServerMessage::file_complete(file_name))
            .await;
    }
}
