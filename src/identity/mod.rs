//! # Crypto Identity
//!
//! The rotating on-chain identity state. A [`CryptoIdentity`] stands in
//! for the user's credentials on the ledger without revealing them.
//!
//! ## State Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CRYPTO IDENTITY                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  input_data    utf8("username:password")                               │
//! │                fixed at account creation, never rotated                │
//! │                                                                         │
//! │  current_salt  32 bytes, rotates on every committed mutation           │
//! │                                                                         │
//! │  proof         keccak256(input_data ‖ current_salt)                    │
//! │                recomputed whenever current_salt rotates                │
//! │                                                                         │
//! │  commitment    keccak256(proof ‖ GLOBAL_SALT)                          │
//! │                the identifier presented to the ledger                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant
//!
//! At all times `proof == H2(input_data, current_salt)` and
//! `commitment == H2(proof, GLOBAL_SALT)`. Any state violating this is
//! corrupt and must not be submitted on-chain — [`CryptoIdentity::verify_invariant`]
//! checks it, and mutation happens only through the commit-protect
//! envelope in [`crate::engine`].
//!
//! ## Lifecycle
//!
//! Created at signup/login from stored credentials; mutated only through
//! the commit-protect envelope; zeroized on logout (the struct is
//! `ZeroizeOnDrop`).

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec;
use crate::crypto::hash::{global_hash, global_hash2, GlobalSalt};

/// The rotating on-chain identity triplet plus its credential binding
///
/// Owned exclusively by the session layer, held in memory, persisted
/// through the secure-storage collaborator. Secrets are zeroized when the
/// last reference drops.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CryptoIdentity {
    /// Canonical credential binding, fixed at account creation
    #[serde(with = "crate::codec::hex_vec")]
    input_data: Vec<u8>,

    /// Rotates on every committed mutation
    #[serde(with = "crate::codec::hex_array")]
    current_salt: [u8; 32],

    /// `H2(input_data, current_salt)` — authorizes the next mutation
    #[serde(with = "crate::codec::hex_array")]
    proof: [u8; 32],

    /// `H2(proof, GLOBAL_SALT)` — the on-chain identifier
    #[serde(with = "crate::codec::hex_array")]
    commitment: [u8; 32],
}

impl CryptoIdentity {
    /// Derive a fresh identity from credentials and an initial salt
    ///
    /// Establishes the invariant by construction. The credential binding
    /// is `utf8("username:password")` and never rotates.
    pub fn derive(
        username: &str,
        password: &str,
        initial_salt: [u8; 32],
        global_salt: &GlobalSalt,
    ) -> Self {
        let input_data = format!("{}:{}", username, password).into_bytes();
        let proof = global_hash2(&input_data, &initial_salt);
        let commitment = global_hash(&proof, global_salt);
        Self {
            input_data,
            current_salt: initial_salt,
            proof,
            commitment,
        }
    }

    /// Check whether the supplied credentials produced this identity
    pub fn matches_credentials(&self, username: &str, password: &str) -> bool {
        self.input_data == format!("{}:{}", username, password).into_bytes()
    }

    /// The credential binding bytes
    pub fn input_data(&self) -> &[u8] {
        &self.input_data
    }

    /// The active salt
    pub fn current_salt(&self) -> &[u8; 32] {
        &self.current_salt
    }

    /// The proof authorizing the next mutation
    pub fn proof(&self) -> &[u8; 32] {
        &self.proof
    }

    /// The on-chain commitment
    pub fn commitment(&self) -> &[u8; 32] {
        &self.commitment
    }

    /// The on-chain commitment as a lowercase `0x`-prefixed hex string
    pub fn commitment_hex(&self) -> String {
        codec::to_hex(&self.commitment)
    }

    /// Verify the hash-chain invariant against a global salt
    ///
    /// A `false` result means the state is corrupt and must not be
    /// submitted on-chain.
    pub fn verify_invariant(&self, global_salt: &GlobalSalt) -> bool {
        let proof = global_hash2(&self.input_data, &self.current_salt);
        proof == self.proof && global_hash(&proof, global_salt) == self.commitment
    }

    /// Advance the triplet to an already-computed next state
    ///
    /// Only the commit-protect envelope calls this, strictly after the
    /// ledger confirmed the corresponding mutation.
    pub(crate) fn apply_rotation(
        &mut self,
        next_salt: [u8; 32],
        next_proof: [u8; 32],
        next_commitment: [u8; 32],
    ) {
        self.current_salt = next_salt;
        self.proof = next_proof;
        self.commitment = next_commitment;
    }
}

impl std::fmt::Debug for CryptoIdentity {
    // input_data and salt are secrets: only the public commitment is shown.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoIdentity")
            .field("commitment", &self.commitment_hex())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn salt() -> GlobalSalt {
        GlobalSalt::from_bytes([11u8; 32])
    }

    #[test]
    fn test_derive_establishes_invariant() {
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        assert!(identity.verify_invariant(&salt()));
        assert_eq!(identity.input_data(), b"alice:hunter2");
    }

    #[test]
    fn test_derive_deterministic() {
        let a = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        let b = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        assert_eq!(a, b);

        let c = CryptoIdentity::derive("alice", "hunter3", [1u8; 32], &salt());
        assert_ne!(a.commitment(), c.commitment());
    }

    #[test]
    fn test_matches_credentials() {
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        assert!(identity.matches_credentials("alice", "hunter2"));
        assert!(!identity.matches_credentials("alice", "wrong"));
        assert!(!identity.matches_credentials("bob", "hunter2"));
    }

    #[test]
    fn test_invariant_detects_corruption() {
        let mut identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        identity.apply_rotation([2u8; 32], *identity.proof(), *identity.commitment());
        assert!(!identity.verify_invariant(&salt()));
    }

    #[test]
    fn test_serde_round_trip() {
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        let json = serde_json::to_string(&identity).unwrap();
        let restored: CryptoIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity, restored);
        assert!(restored.verify_invariant(&salt()));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt());
        let debug = format!("{:?}", identity);
        assert!(debug.contains(&identity.commitment_hex()));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("alice"));
    }
}
