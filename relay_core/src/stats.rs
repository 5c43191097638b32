//! Process-wide counters shown on the landing page.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Stats {
    visitors: AtomicU64,
    files_transferred: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitCount {
    #[serde(rename = "NoOfVisitors")]
    pub visitors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    #[serde(rename = "NoOfVisitors")]
    pub visitors: u64,
    #[serde(rename = "NoOfFilesTransferred")]
    pub files_transferred: u64,
}

impl Stats {
    /// Count one visit and return the new total
    pub fn record_visit(&self) -> VisitCount {
        VisitCount {
            visitors: self.visitors.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }

    pub fn add_files_transferred(&self, count: u64) {
        self.files_transferred.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            visitors: self.visitors.load(Ordering::Relaxed),
            files_transferred: self.files_transferred.load(Ordering::Relaxed),
        }
    }
}
