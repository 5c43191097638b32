//! Connection registry: share codes and origin codes mapped to live
//! connections.
//!
//! Entries carry no TTL; they live until the owning connection closes and
//! [`Registry::purge`] runs.

use crate::codes::{Code, OriginCode, ShareCode};
use crate::connection::{ConnectionHandle, ConnectionId};
use crate::error::RelayError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

/// Generation attempts before a code space is considered exhausted
pub const MAX_ISSUE_ATTEMPTS: u32 = 16;

/// One code space
pub struct CodeMap<C: Code> {
    entries: RwLock<HashMap<C, ConnectionHandle>>,
}

impl<C: Code> Default for CodeMap<C> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: Code> CodeMap<C> {
    /// Bind `code` to `conn`, replacing any previous binding
    pub async fn register(&self, code: C, conn: ConnectionHandle) -> Option<ConnectionHandle> {
        self.entries.write().await.insert(code, conn)
    }

    /// Mint a code that is not currently live and bind it to `conn`
    pub async fn issue(&self, conn: &ConnectionHandle) -> Result<C, RelayError> {
        let mut entries = self.entries.write().await;
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            if let Entry::Vacant(slot) = entries.entry(C::generate()) {
                let code = slot.key().clone();
                slot.insert(conn.clone());
                return Ok(code);
            }
        }
        Err(RelayError::CodeSpaceExhausted {
            space: C::SPACE,
            attempts: MAX_ISSUE_ATTEMPTS,
        })
    }

    pub async fn lookup(&self, code: &C) -> Option<ConnectionHandle> {
        self.entries.read().await.get(code).cloned()
    }

    /// Remove every entry pointing at `conn`, returning the removed codes
    pub async fn purge(&self, conn: ConnectionId) -> Vec<C> {
        let mut entries = self.entries.write().await;
        let mut removed = Vec::new();
        entries.retain(|code, owner| {
            let keep = owner.id() != conn;
            if !keep {
                removed.push(code.clone());
            }
            keep
        });
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// What a purge removed
#[derive(Debug, Default)]
pub struct Purged {
    pub share_codes: Vec<ShareCode>,
    pub origin_codes: Vec<OriginCode>,
}

impl Purged {
    pub fn is_empty(&self) -> bool {
        self.share_codes.is_empty() && self.origin_codes.is_empty()
    }
}

#[derive(Default)]
pub struct Registry {
    pub share_codes: CodeMap<ShareCode>,
    pub origin_codes: CodeMap<OriginCode>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every code in both spaces owned by `conn`.
    ///
    /// Safe to call for a connection that owns nothing.
    pub async fn purge(&self, conn: ConnectionId) -> Purged {
        Purged {
            share_codes: self.share_codes.purge(conn).await,
            origin_codes: self.origin_codes.purge(conn).await,
        }
    }
}
