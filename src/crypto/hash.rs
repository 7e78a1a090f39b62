//! # Commitment Hash Chain
//!
//! Deterministic Keccak-256 derivation of the rotating on-chain identity
//! triplet (`commitment`, `proof`, `current_salt`).
//!
//! ## The packed hash primitive
//!
//! Everything here reduces to one fixed, domain-separated primitive:
//!
//! ```text
//! H2(a, b) = keccak256(a ‖ b)
//! ```
//!
//! where `a` is an arbitrary byte sequence, `b` is exactly 32 bytes, and
//! `‖` is Solidity-style tight packing — raw concatenation with no length
//! prefixes. The ledger's contract recomputes the same hash to validate a
//! submitted commitment, so any change to the encoding (length prefixes,
//! fixed-width integers) silently produces hashes that "work" locally but
//! fail on-chain verification. This must remain exact tight packing.
//!
//! ## Derived operations
//!
//! | Operation | Definition |
//! |-----------|------------|
//! | `global_hash(data, salt)` | `H2(data, GLOBAL_SALT)` |
//! | `global_hash2(data, salt)` | `H2(data, salt)` — explicit salt, used mid-rotation |
//! | `recovery_vault_commitment(input, salt)` | `H2(H2(input, salt), salt)` |
//!
//! All functions are pure and deterministic; they are safe to call from
//! any thread and never suspend.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::codec;
use crate::error::{Error, Result};

/// Size of a hash output in bytes
pub const HASH_SIZE: usize = 32;

/// Process-wide domain-separation value mixed into every hash-chain and
/// key-derivation step
///
/// Fetched once per session from the server bootstrap config and shared
/// read-only across all identity instances, so that commitments are not
/// guessable cross-deployment. Not a secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSalt(#[serde(with = "crate::codec::hex_array")] [u8; HASH_SIZE]);

impl GlobalSalt {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from a `0x`-prefixed hex string
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidEncoding`] unless the input decodes to
    /// exactly 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = codec::to_bytes(s)?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::InvalidEncoding(format!("Global salt must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw salt bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Encode as a lowercase `0x`-prefixed hex string
    pub fn to_hex(&self) -> String {
        codec::to_hex(&self.0)
    }
}

impl std::fmt::Debug for GlobalSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GlobalSalt({})", self.to_hex())
    }
}

/// Plain Keccak-256 of a byte sequence
pub fn keccak256(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The fixed packed-hash primitive: `keccak256(a ‖ b)`
///
/// Tight packing — `a`'s raw bytes followed by `b`'s 32 raw bytes, no
/// length prefixes.
pub fn hash_packed(a: &[u8], b: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// Hash `data` against the session's global salt
pub fn global_hash(data: &[u8], salt: &GlobalSalt) -> [u8; HASH_SIZE] {
    hash_packed(data, &salt.0)
}

/// Hash `data` against an explicit salt
///
/// Used mid-rotation, when the freshly derived next salt is not yet the
/// identity's active salt.
pub fn global_hash2(data: &[u8], salt: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    hash_packed(data, salt)
}

/// Derive the lookup commitment for the recovery vault: `H2(H2(input, salt), salt)`
///
/// The double hash keeps the vault lookup key independent of the live
/// account commitment.
pub fn recovery_vault_commitment(input_data: &[u8], salt: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    hash_packed(&hash_packed(input_data, salt), salt)
}

// ============================================================================
// TESTS
// ============================================================================
