//! # Key Agreement
//!
//! X25519 key pairs and Diffie-Hellman shared-secret computation for the
//! recovery vault's key encapsulation.
//!
//! ## Key Properties
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AgreementKeyPair (X25519)                                             │
//! │  ──────────────────────────                                             │
//! │                                                                         │
//! │  • Private key: exactly 32 bytes (zeroized on drop)                    │
//! │  • Public key: 32 bytes (safe to share; the vault lookup key)          │
//! │                                                                         │
//! │  Symmetry: sharedSecret(a.priv, b.pub) == sharedSecret(b.priv, a.pub)  │
//! │  for any honestly generated pair.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Private keys never leave this module except through
//! [`AgreementKeyPair::secret_bytes`], which exists solely for secure
//! storage. They are never logged or serialized elsewhere; callers work
//! with public keys and derived symmetric keys.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// X25519 key pair for key encapsulation
#[derive(ZeroizeOnDrop)]
pub struct AgreementKeyPair {
    /// Private scalar (secret)
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    /// Public point (derived from secret)
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl AgreementKeyPair {
    /// Generate a new random key pair
    ///
    /// Uses the operating system's secure random number generator. Used
    /// for the ephemeral encapsulation pair when sealing a vault record.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create a key pair from raw private-key bytes
    ///
    /// Deterministic: the same bytes always produce the same pair. The
    /// public key is scalar multiplication by the X25519 base point.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] unless the input is exactly
    /// 32 bytes — anything else indicates an upstream derivation bug.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyLength(bytes.len()))?;
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Get the secret key bytes (for secure storage only)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Perform Diffie-Hellman key exchange
    ///
    /// Returns the shared secret both parties can compute:
    /// - Alice: alice_secret × bob_public
    /// - Bob: bob_secret × alice_public
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        let their_public = X25519PublicKey::from(*their_public);
        self.secret.diffie_hellman(&their_public).to_bytes()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_pairs_distinct() {
        let kp1 = AgreementKeyPair::generate();
        let kp2 = AgreementKeyPair::generate();
        assert_ne!(kp1.public_bytes(), kp2.public_bytes());
    }

    #[test]
    fn test_from_bytes_deterministic() {
        let seed = [42u8; 32];
        let kp1 = AgreementKeyPair::from_bytes(&seed).unwrap();
        let kp2 = AgreementKeyPair::from_bytes(&seed).unwrap();
        assert_eq!(kp1.public_bytes(), kp2.public_bytes());
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert!(matches!(
            AgreementKeyPair::from_bytes(&[0u8; 16]),
            Err(Error::InvalidKeyLength(16))
        ));
        assert!(matches!(
            AgreementKeyPair::from_bytes(&[0u8; 33]),
            Err(Error::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn test_diffie_hellman_symmetry() {
        let alice = AgreementKeyPair::generate();
        let bob = AgreementKeyPair::generate();

        let alice_shared = alice.diffie_hellman(&bob.public_bytes());
        let bob_shared = bob.diffie_hellman(&alice.public_bytes());
        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn test_diffie_hellman_symmetry_many_pairs() {
        // Property check over many randomly generated pairs.
        for _ in 0..1000 {
            let a = AgreementKeyPair::generate();
            let b = AgreementKeyPair::generate();
            assert_eq!(
                a.diffie_hellman(&b.public_bytes()),
                b.diffie_hellman(&a.public_bytes())
            );
        }
    }
}
