//! # Error Handling
//!
//! This module provides the error types for VeilPay Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Codec Errors                                                      │
//! │  │   └── InvalidEncoding          - Malformed hex/UTF-8 input          │
//! │  │                                                                      │
//! │  ├── Identity Errors                                                   │
//! │  │   ├── NoIdentity               - No identity loaded                 │
//! │  │   ├── IdentityExists           - Identity already exists            │
//! │  │   └── InvalidCredentials       - Credential mismatch on login       │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidKeyLength         - Private key is not 32 bytes        │
//! │  │   ├── KeyDerivationFailed      - HKDF expansion failed              │
//! │  │   ├── EncryptionFailed         - AES-GCM seal failed                │
//! │  │   └── AuthenticationFailed     - AES-GCM tag verification failed    │
//! │  │                                                                      │
//! │  ├── Recovery Errors                                                   │
//! │  │   ├── VaultRecordNotFound      - No vault record for recovery key   │
//! │  │   ├── CorruptRecord            - Decrypted record has wrong shape   │
//! │  │   └── InvalidRecoveryCode      - Recovery code failed validation    │
//! │  │                                                                      │
//! │  ├── Ledger Errors                                                     │
//! │  │   ├── LedgerRejected           - Remote mutation call failed        │
//! │  │   ├── ConcurrentMutationBlocked- Identity lock was held             │
//! │  │   └── InvalidAmount            - Amount fails local validation      │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageReadError         - Failed to read from secure store   │
//! │  │   ├── StorageWriteError        - Failed to write to secure store    │
//! │  │   └── StorageCorrupted         - Persisted state is inconsistent    │
//! │  │                                                                      │
//! │  └── Config Errors                                                     │
//! │      └── ConfigInvalid            - Bootstrap config failed validation │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! The commit-protect envelope guarantees that any error surfaced from a
//! mutating operation leaves the local [`CryptoIdentity`](crate::identity::CryptoIdentity)
//! byte-identical to its pre-call value, so every recoverable error can be
//! retried from scratch. `AuthenticationFailed` must never be retried with
//! the same inputs: it means the code/key was wrong, not that the network
//! hiccuped.

use thiserror::Error;

/// Result type alias for VeilPay Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for VeilPay Core
///
/// Errors are categorized by module/domain to make error handling clearer
/// and to let the UI layer distinguish "wrong recovery code" (permanent)
/// from "network/ledger error" (retryable).
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Codec Errors (100-199)
    // ========================================================================

    /// Malformed hex, UTF-8, or over-long input to a codec function
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================

    /// No identity has been loaded
    #[error("No identity loaded. Create an account or log in first.")]
    NoIdentity,

    /// An identity already exists
    #[error("An identity already exists for this session.")]
    IdentityExists,

    /// Supplied credentials do not match the stored identity
    #[error("Credentials do not match the stored identity.")]
    InvalidCredentials,

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// A key-agreement private key is not exactly 32 bytes.
    /// This indicates an upstream derivation bug and is fatal in
    /// production paths.
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// HKDF expansion failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// AES-GCM encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AES-GCM tag verification failed: tampered ciphertext, wrong key,
    /// or wrong nonce
    #[error("Authentication failed: ciphertext tag did not verify")]
    AuthenticationFailed,

    // ========================================================================
    // Recovery Errors (400-499)
    // ========================================================================

    /// No recovery vault record exists for the derived public key
    #[error("No vault record found for this recovery code.")]
    VaultRecordNotFound,

    /// Decrypted vault plaintext has an unexpected shape.
    /// Surfaced to the user like `AuthenticationFailed`, logged distinctly
    /// for diagnostics.
    #[error("Corrupt vault record: {0}")]
    CorruptRecord(String),

    /// A recovery code failed structural validation
    #[error("Invalid recovery code: {0}")]
    InvalidRecoveryCode(String),

    // ========================================================================
    // Ledger Errors (500-599)
    // ========================================================================

    /// The remote mutation call failed or was rejected. No local state was
    /// mutated; the whole operation may be retried from scratch.
    #[error("Ledger rejected the mutation: {0}")]
    LedgerRejected(String),

    /// A second mutation attempt was rejected because the identity's
    /// exclusive lock was held. Retry after backoff.
    #[error("Another mutation is in flight for this identity.")]
    ConcurrentMutationBlocked,

    /// A mutation amount failed local validation (zero, or below the
    /// configured minimum)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ========================================================================
    // Storage Errors (600-699)
    // ========================================================================

    /// Failed to read from the secure store
    #[error("Failed to read from secure storage: {0}")]
    StorageReadError(String),

    /// Failed to write to the secure store
    #[error("Failed to write to secure storage: {0}")]
    StorageWriteError(String),

    /// Persisted or local state is inconsistent with the ledger
    #[error("Stored state is corrupted: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Config Errors (700-799)
    // ========================================================================

    /// The bootstrap config failed validation
    #[error("Invalid bootstrap config: {0}")]
    ConfigInvalid(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code for the app boundary
    ///
    /// Error codes are organized by category:
    /// - 100-199: Codec
    /// - 200-299: Identity
    /// - 300-399: Crypto
    /// - 400-499: Recovery
    /// - 500-599: Ledger
    /// - 600-699: Storage
    /// - 700-799: Config
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Codec (100-199)
            Error::InvalidEncoding(_) => 100,

            // Identity (200-299)
            Error::NoIdentity => 200,
            Error::IdentityExists => 201,
            Error::InvalidCredentials => 202,

            // Crypto (300-399)
            Error::InvalidKeyLength(_) => 300,
            Error::KeyDerivationFailed(_) => 301,
            Error::EncryptionFailed(_) => 302,
            Error::AuthenticationFailed => 303,

            // Recovery (400-499)
            Error::VaultRecordNotFound => 400,
            Error::CorruptRecord(_) => 401,
            Error::InvalidRecoveryCode(_) => 402,

            // Ledger (500-599)
            Error::LedgerRejected(_) => 500,
            Error::ConcurrentMutationBlocked => 501,
            Error::InvalidAmount(_) => 502,

            // Storage (600-699)
            Error::StorageReadError(_) => 600,
            Error::StorageWriteError(_) => 601,
            Error::StorageCorrupted(_) => 602,

            // Config (700-799)
            Error::ConfigInvalid(_) => 700,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can be resolved by retrying the whole operation
    /// or by user action (e.g., re-entering a recovery code). The
    /// commit-protect envelope guarantees no partial local state survives
    /// a recoverable failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidEncoding(_)
                | Error::InvalidCredentials
                | Error::AuthenticationFailed
                | Error::VaultRecordNotFound
                | Error::CorruptRecord(_)
                | Error::InvalidRecoveryCode(_)
                | Error::LedgerRejected(_)
                | Error::ConcurrentMutationBlocked
                | Error::InvalidAmount(_)
        )
    }

    /// Check if this error requires user action rather than a retry
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::NoIdentity
                | Error::InvalidCredentials
                | Error::VaultRecordNotFound
                | Error::InvalidRecoveryCode(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidEncoding("test".into()).code(), 100);
        assert_eq!(Error::NoIdentity.code(), 200);
        assert_eq!(Error::InvalidKeyLength(16).code(), 300);
        assert_eq!(Error::VaultRecordNotFound.code(), 400);
        assert_eq!(Error::LedgerRejected("test".into()).code(), 500);
        assert_eq!(Error::StorageReadError("test".into()).code(), 600);
        assert_eq!(Error::ConfigInvalid("test".into()).code(), 700);
        assert_eq!(Error::SerializationError("test".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::LedgerRejected("timeout".into()).is_recoverable());
        assert!(Error::ConcurrentMutationBlocked.is_recoverable());
        assert!(Error::AuthenticationFailed.is_recoverable());
        // A 16-byte private key means an upstream derivation bug: fatal.
        assert!(!Error::InvalidKeyLength(16).is_recoverable());
        assert!(!Error::KeyDerivationFailed("test".into()).is_recoverable());
    }

    #[test]
    fn test_user_action_errors() {
        assert!(Error::VaultRecordNotFound.requires_user_action());
        assert!(!Error::LedgerRejected("down".into()).requires_user_action());
    }
}
