//! # Key Derivation
//!
//! HKDF-SHA256 extract-then-expand with a fixed 32-byte output, used at
//! two points in the recovery protocol:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 RECOVERY KEY DERIVATION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Recovery private key (deterministic — this IS the recovery secret)    │
//! │  ──────────────────────────────────────────────────────────────────     │
//! │  HKDF-SHA256(                                                          │
//! │    ikm  = keccak256(recovery_code ‖ GLOBAL_SALT),                      │
//! │    salt = "rv-seed",                                                   │
//! │    info = "pw-recovery-v1-seed"                                        │
//! │  )  → X25519 private scalar                                            │
//! │                                                                         │
//! │  Envelope key                                                          │
//! │  ─────────────                                                          │
//! │  HKDF-SHA256(                                                          │
//! │    ikm  = X25519 shared secret,                                        │
//! │    salt = GLOBAL_SALT,                                                 │
//! │    info = "pw-recovery-v1"                                             │
//! │  )  → AES-256-GCM key                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `info` strings provide cryptographic domain separation: the seed
//! derivation and the envelope key can never collide even if their inputs
//! did. The `-v1` suffix leaves room for future algorithm upgrades.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{Error, Result};

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are
/// cryptographically independent.
pub mod domain {
    /// HKDF salt for recovery seed derivation
    pub const RECOVERY_SEED_SALT: &[u8] = b"rv-seed";

    /// Info string for deriving the recovery private key from a code hash
    pub const RECOVERY_SEED: &[u8] = b"pw-recovery-v1-seed";

    /// Info string for deriving the vault envelope key from a shared secret
    pub const RECOVERY_ENVELOPE: &[u8] = b"pw-recovery-v1";
}

/// HKDF-SHA256 extract-then-expand into a fixed 32-byte key
///
/// Output length is fixed at 32 bytes regardless of input lengths.
///
/// ## Errors
///
/// Returns [`Error::KeyDerivationFailed`] if expansion fails (cannot
/// happen for a 32-byte output; kept as an explicit error rather than a
/// panic because the failure would indicate a library defect).
pub fn hkdf_expand(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; 32];
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;
    Ok(okm)
}

// ============================================================================
// TESTS
// ============================================================================
