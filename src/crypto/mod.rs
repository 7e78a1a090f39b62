//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by VeilPay Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    COMMITMENT HASH CHAIN                        │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  input_data = utf8("username:password")                        │   │
//! │  │                                                                 │   │
//! │  │  proof      = keccak256(input_data ‖ current_salt)             │   │
//! │  │  commitment = keccak256(proof ‖ GLOBAL_SALT)                   │   │
//! │  │                                                                 │   │
//! │  │  Solidity-style tight packing, no length prefixes: the         │   │
//! │  │  on-chain verifier recomputes the same hash byte-for-byte.     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    RECOVERY ENVELOPE                            │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Key Encapsulation: X25519 ECDH                             │   │
//! │  │     recovery_priv × ephemeral_pub = shared secret              │   │
//! │  │                                                                 │   │
//! │  │  2. Key Derivation: HKDF-SHA256                                │   │
//! │  │     shared secret → AES-256 key (32 bytes)                     │   │
//! │  │                                                                 │   │
//! │  │  3. Encryption: AES-256-GCM                                    │   │
//! │  │     • 256-bit key                                              │   │
//! │  │     • 96-bit nonce (random per seal)                           │   │
//! │  │     • 128-bit authentication tag                               │   │
//! │  │     • fixed 32-byte padded plaintext                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | Keccak-256 | Commitment chain | Must match the on-chain verifier |
//! | X25519 | Key encapsulation | Fast ECDH, small deterministic keys |
//! | AES-256-GCM | Sealed envelopes | Hardware acceleration, AEAD |
//! | HKDF-SHA256 | Key derivation | Industry standard, well-analyzed |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Constant-Time Operations**: Using dalek for constant-time crypto
//! 3. **Secure Random**: Using `rand::rngs::OsRng` for nonces and keys
//! 4. **No Nonce Reuse**: Every seal draws a fresh random nonce

pub mod encryption;
pub mod hash;
pub mod kdf;
pub mod keys;

pub use encryption::{open, seal, EnvelopeKey, Nonce, SealedBox, NONCE_SIZE, TAG_SIZE};
pub use hash::{global_hash, global_hash2, keccak256, recovery_vault_commitment, GlobalSalt};
pub use kdf::hkdf_expand;
pub use keys::AgreementKeyPair;

/// Size of symmetric and asymmetric keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
