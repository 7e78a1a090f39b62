//! # Secure Storage
//!
//! Platform-agnostic persistence for the identity snapshot.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SECURE STORAGE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SecureStore Trait                                                     │
//! │  ──────────────────                                                     │
//! │                                                                         │
//! │  • store(key, value)   - Persist a value                               │
//! │  • retrieve(key)       - Load a value, None if absent                  │
//! │  • delete(key)         - Remove a value                                │
//! │  • exists(key)         - Check presence without loading                │
//! │                                                                         │
//! │  Backed in production by the platform keychain/keystore                │
//! │  (iOS Keychain, Android Keystore, macOS Keychain, libsecret);          │
//! │  [`MemorySecureStore`] is the development/testing implementation.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core treats the store as opaque bytes and never assumes
//! encryption-at-rest: the platform backend decides how values are
//! protected. What lands here is the identity snapshot, which contains
//! the credential binding, so the backend must be an actual secure store
//! in production.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::identity::CryptoIdentity;

/// Key names for secure storage
pub mod keys {
    /// The persisted identity snapshot
    pub const IDENTITY: &str = "veilpay.identity";
}

/// Platform-agnostic secure storage interface
pub trait SecureStore: Send + Sync {
    /// Persist a value under a key, replacing any previous value
    fn store(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Load a value, or `None` if the key is absent
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a value; removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// Check presence without loading the value
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.retrieve(key)?.is_some())
    }
}

/// In-memory store for development and testing
#[derive(Default)]
pub struct MemorySecureStore {
    memory: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        self.memory.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.memory.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.memory.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.memory.read().contains_key(key))
    }
}

// ============================================================================
// IDENTITY PERSISTENCE
// ============================================================================

/// Persist an identity snapshot
///
/// Overwrites any previous snapshot; the store always holds the latest
/// committed state.
pub fn persist_identity<S: SecureStore + ?Sized>(
    store: &S,
    identity: &CryptoIdentity,
) -> Result<()> {
    let json = serde_json::to_vec(identity)?;
    store.store(keys::IDENTITY, &json)
}

/// Load the persisted identity snapshot, or `None` if none exists
///
/// ## Errors
///
/// Returns [`Error::StorageCorrupted`] if a snapshot exists but does not
/// parse. Callers should treat this as an unrecoverable local state and
/// fall back to the recovery flow.
pub fn load_identity<S: SecureStore + ?Sized>(store: &S) -> Result<Option<CryptoIdentity>> {
    let Some(bytes) = store.retrieve(keys::IDENTITY)? else {
        return Ok(None);
    };
    let identity = serde_json::from_slice(&bytes)
        .map_err(|e| Error::StorageCorrupted(format!("Identity snapshot unparsable: {}", e)))?;
    Ok(Some(identity))
}

/// Delete the persisted identity snapshot
pub fn delete_identity<S: SecureStore + ?Sized>(store: &S) -> Result<()> {
    store.delete(keys::IDENTITY)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::GlobalSalt;

    fn identity() -> CryptoIdentity {
        CryptoIdentity::derive(
            "alice",
            "hunter2",
            [1u8; 32],
            &GlobalSalt::from_bytes([11u8; 32]),
        )
    }

    #[test]
    fn test_store_retrieve_delete() {
        let store = MemorySecureStore::new();
        assert!(!store.exists("k").unwrap());

        store.store("k", b"value").unwrap();
        assert!(store.exists("k").unwrap());
        assert_eq!(store.retrieve("k").unwrap().unwrap(), b"value");

        store.store("k", b"replaced").unwrap();
        assert_eq!(store.retrieve("k").unwrap().unwrap(), b"replaced");

        store.delete("k").unwrap();
        assert!(store.retrieve("k").unwrap().is_none());
        // Deleting again is a no-op
        store.delete("k").unwrap();
    }

    #[test]
    fn test_identity_persistence_round_trip() {
        let store = MemorySecureStore::new();
        assert!(load_identity(&store).unwrap().is_none());

        let identity = identity();
        persist_identity(&store, &identity).unwrap();
        assert_eq!(load_identity(&store).unwrap().unwrap(), identity);

        delete_identity(&store).unwrap();
        assert!(load_identity(&store).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_detected() {
        let store = MemorySecureStore::new();
        store.store(keys::IDENTITY, b"not json").unwrap();
        assert!(matches!(
            load_identity(&store),
            Err(Error::StorageCorrupted(_))
        ));
    }
}
