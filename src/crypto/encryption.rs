//! # Sealed Envelopes
//!
//! AES-256-GCM authenticated encryption over fixed 32-byte padded
//! plaintexts. Used for the recovery vault and wherever committed secrets
//! must be stored encrypted.
//!
//! ## Envelope Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SEALED ENVELOPE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  seal(key, plaintext[32])                                              │
//! │       │                                                                 │
//! │       ├── nonce: 12 random bytes, fresh per call                       │
//! │       ├── ciphertext: 32 bytes                                         │
//! │       └── tag: 16-byte authentication tag                              │
//! │                                                                         │
//! │  open(key, ciphertext, tag, nonce)                                     │
//! │       │                                                                 │
//! │       ├── tag verifies  → plaintext (32 bytes)                         │
//! │       └── tag mismatch  → AuthenticationFailed                         │
//! │                           (never partial/unauthenticated plaintext)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nonce reuse under the same key is a fatal protocol violation; it never
//! occurs because each [`seal`] call draws a fresh random nonce from the
//! OS CSPRNG. Plaintext length is fixed at 32 bytes — callers pad/unpad
//! via [`crate::codec`].

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the sealed plaintext in bytes
pub const PLAINTEXT_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// ## Critical Security Requirement
///
/// **NEVER reuse a nonce with the same key!** Random 96-bit nonces are
/// safe for up to 2^32 messages per key (birthday bound); a vault record
/// is sealed far fewer times than that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM envelope key
///
/// Zeroized when dropped for security.
#[derive(ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; 32]);

impl EnvelopeKey {
    /// Create from raw bytes (typically HKDF output)
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A sealed ciphertext + authentication tag + nonce triplet
///
/// Wire form matches the ledger's vault record fields: lowercase
/// `0x`-prefixed hex for each component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    /// The AES-GCM ciphertext (same length as the plaintext)
    #[serde(rename = "ct", with = "crate::codec::hex_vec")]
    pub ciphertext: Vec<u8>,

    /// The 16-byte authentication tag
    #[serde(with = "crate::codec::hex_array")]
    pub tag: [u8; TAG_SIZE],

    /// The 12-byte nonce used for this seal
    #[serde(with = "crate::codec::hex_array")]
    pub nonce: [u8; NONCE_SIZE],
}

/// Encrypt a 32-byte plaintext under a fresh random nonce
///
/// ## Errors
///
/// Returns [`Error::EncryptionFailed`] if the cipher rejects the key
/// (cannot happen for a 32-byte key from [`EnvelopeKey`]).
pub fn seal(key: &EnvelopeKey, plaintext: &[u8; PLAINTEXT_SIZE]) -> Result<SealedBox> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let mut ct_with_tag = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), plaintext.as_slice())
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    // aes-gcm appends the tag to the ciphertext; the wire format carries
    // them as separate fields.
    let tag_start = ct_with_tag.len() - TAG_SIZE;
    let tag: [u8; TAG_SIZE] = ct_with_tag[tag_start..]
        .try_into()
        .map_err(|_| Error::EncryptionFailed("Tag extraction failed".into()))?;
    ct_with_tag.truncate(tag_start);

    Ok(SealedBox {
        ciphertext: ct_with_tag,
        tag,
        nonce: nonce.0,
    })
}

/// Decrypt and authenticate a sealed envelope
///
/// ## Errors
///
/// Returns [`Error::AuthenticationFailed`] if the tag does not verify —
/// tampered ciphertext, wrong key, or wrong nonce. Never returns partial
/// or unauthenticated plaintext.
pub fn open(key: &EnvelopeKey, sealed: &SealedBox) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|_| Error::AuthenticationFailed)?;

    let mut ct_with_tag = sealed.ciphertext.clone();
    ct_with_tag.extend_from_slice(&sealed.tag);

    cipher
        .decrypt(AesNonce::from_slice(&sealed.nonce), ct_with_tag.as_slice())
        .map_err(|_| Error::AuthenticationFailed)
}

// ============================================================================
// TESTS
// ============================================================================
