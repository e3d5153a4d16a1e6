//! Fingerprint table
//!
//! Shared map from connection to the ClientHello captured when it was
//! accepted. The accept path writes, request handlers read.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::trace;

use super::hello::RawHelloInfo;

/// Identity of one accepted connection
///
/// The peer address alone is not unique over time (client ports are
/// reused), so every accepted connection also gets a process-wide serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnKey {
    id: u64,
    peer: SocketAddr,
}

impl ConnKey {
    /// Create a key from a connection serial and the remote address
    pub fn new(id: u64, peer: SocketAddr) -> Self {
        Self { id, peer }
    }

    /// Connection serial
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote endpoint of the connection
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl fmt::Display for ConnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer, self.id)
    }
}

/// Concurrent connection → ClientHello map
///
/// Cloning the table clones a handle; all clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct FingerprintTable {
    entries: Arc<RwLock<HashMap<ConnKey, Arc<RawHelloInfo>>>>,
}

impl FingerprintTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the ClientHello of a connection
    pub fn put(&self, key: ConnKey, info: RawHelloInfo) {
        self.write().insert(key, Arc::new(info));
    }

    /// Look up the ClientHello of a connection
    ///
    /// Unknown connections yield an empty record; lookups never fail.
    pub fn get(&self, key: &ConnKey) -> Arc<RawHelloInfo> {
        self.read().get(key).cloned().unwrap_or_default()
    }

    /// Forget a connection
    pub fn remove(&self, key: &ConnKey) -> Option<Arc<RawHelloInfo>> {
        self.write().remove(key)
    }

    /// Store the ClientHello and tie the entry's lifetime to the returned guard
    pub fn register(&self, key: ConnKey, info: RawHelloInfo) -> Registration {
        self.put(key, info);
        Registration {
            table: self.clone(),
            key,
        }
    }

    /// Number of tracked connections
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no connection is tracked
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock must not disable fingerprinting for
    // every later connection, so poisoning is ignored. Entries are whole
    // values, never left half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnKey, Arc<RawHelloInfo>>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnKey, Arc<RawHelloInfo>>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a table entry alive for as long as its connection is served
///
/// Dropping the registration removes the entry.
#[derive(Debug)]
pub struct Registration {
    table: FingerprintTable,
    key: ConnKey,
}

impl Registration {
    /// Key of the registered connection
    pub fn key(&self) -> ConnKey {
        self.key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.table.remove(&self.key).is_some() {
            trace!("Released fingerprint for {}", self.key);
        }
    }
}
