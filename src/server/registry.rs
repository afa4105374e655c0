//! RAM-only registry of client public keys.
//!
//! Entries are created by `/v1/kex` and read by every authenticated
//! endpoint. Nothing expires: the map lives as long as the server process.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::crypto::PublicKey;
use crate::identity::ClientId;

/// Maps client identities to the public key they registered.
///
/// Handlers run concurrently on the tokio pool; all access goes through the
/// lock.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<ClientId, PublicKey>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `key` for `id`, replacing any earlier registration.
    ///
    /// Returns the key that was replaced.
    pub fn register(&self, id: ClientId, key: PublicKey) -> Option<PublicKey> {
        self.peers.write().insert(id, key)
    }

    /// Look up the key registered for `id`.
    pub fn lookup(&self, id: &ClientId) -> Option<PublicKey> {
        self.peers.read().get(id).copied()
    }

    /// Number of registered clients.
    pub fn count(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no client has registered yet.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
