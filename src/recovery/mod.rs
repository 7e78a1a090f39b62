//! # Password Recovery Vault
//!
//! Asymmetric sealing of the account password under a key derived from a
//! human-holdable recovery code. The vault record lives on the ledger;
//! holding the code is necessary and sufficient to open it.
//!
//! ## Protocol
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RECOVERY VAULT PROTOCOL                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SEAL (at account setup)                                               │
//! │  ───────────────────────                                                │
//! │  code_hash   = H2(recovery_code, GLOBAL_SALT)                          │
//! │  rec_priv    = HKDF(code_hash, "rv-seed", "pw-recovery-v1-seed")       │
//! │  rec_pub     = X25519_base_mult(rec_priv)      ◄── vault lookup key    │
//! │                                                                         │
//! │  eph         = fresh X25519 pair                                       │
//! │  shared      = DH(eph.priv, rec_pub)                                   │
//! │  aes_key     = HKDF(shared, GLOBAL_SALT, "pw-recovery-v1")             │
//! │  record      = { rec_pub, ct_kem: eph.pub,                             │
//! │                  seal(aes_key, pad32(password)) }                      │
//! │                                                                         │
//! │  RECOVER (from code alone)                                             │
//! │  ─────────────────────────                                              │
//! │  re-derive rec_priv/rec_pub from the code                              │
//! │  fetch record by rec_pub          ── absent → VaultRecordNotFound      │
//! │  shared   = DH(rec_priv, ct_kem)                                       │
//! │  aes_key  = HKDF(shared, GLOBAL_SALT, "pw-recovery-v1")                │
//! │  open + unpad                     ── bad tag → AuthenticationFailed    │
//! │                                   ── bad shape → CorruptRecord         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The recovery key pair is fully deterministic in the code: the ephemeral
//! private key is discarded after sealing, so the DH secret is only ever
//! recomputable by someone who can re-derive `rec_priv` from the code.
//!
//! Sealing happens locally; publishing the produced [`VaultRecord`]
//! on-chain goes through the app's own submission path, not this module.

use std::sync::Arc;

use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::codec;
use crate::crypto::encryption::{open, seal, EnvelopeKey, SealedBox, PLAINTEXT_SIZE};
use crate::crypto::hash::{global_hash, GlobalSalt};
use crate::crypto::kdf::{domain, hkdf_expand};
use crate::crypto::keys::AgreementKeyPair;
use crate::error::{Error, Result};
use crate::ledger::Ledger;

/// Number of words in a generated recovery code
pub const WORD_COUNT: usize = 12;

/// Entropy size in bytes for 12 words (128 bits)
const ENTROPY_BYTES: usize = 16;

// ============================================================================
// VAULT RECORD
// ============================================================================

/// The on-ledger vault record, keyed by the recovery public key
///
/// Contains nothing secret: the password is recoverable only by
/// re-deriving the recovery private key from the code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// X25519 public key derived from the recovery code (the lookup key)
    #[serde(with = "crate::codec::hex_array")]
    pub recovery_public_key: [u8; 32],

    /// The ephemeral encapsulation public key
    #[serde(with = "crate::codec::hex_array")]
    pub ct_kem: [u8; 32],

    /// The sealed, padded password
    #[serde(flatten)]
    pub sealed: SealedBox,
}

// ============================================================================
// RECOVERY CODE
// ============================================================================

/// A BIP39 recovery code
///
/// ## Security Warning
///
/// - This code alone opens the password vault
/// - Show it to the user exactly once; never log or store it digitally
#[derive(ZeroizeOnDrop)]
pub struct RecoveryCode {
    #[zeroize(skip)] // bip39::Mnemonic doesn't implement Zeroize
    mnemonic: Mnemonic,
}

impl RecoveryCode {
    /// Generate a new random 12-word recovery code
    pub fn generate() -> Result<Self> {
        let entropy = codec::random_bytes(ENTROPY_BYTES);
        let mnemonic = Mnemonic::from_entropy(&entropy).map_err(|e| {
            Error::KeyDerivationFailed(format!("Failed to generate mnemonic: {}", e))
        })?;
        Ok(Self { mnemonic })
    }

    /// Parse a recovery code from its phrase
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidRecoveryCode`] unless the input is exactly
    /// 12 valid BIP39 English words with a correct checksum. The checksum
    /// catches most typos before any vault lookup happens.
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| Error::InvalidRecoveryCode(format!("{}", e)))?;
        if mnemonic.word_count() != WORD_COUNT {
            return Err(Error::InvalidRecoveryCode(format!(
                "Expected {} words, got {}",
                WORD_COUNT,
                mnemonic.word_count()
            )));
        }
        Ok(Self { mnemonic })
    }

    /// The words of the code
    pub fn words(&self) -> Vec<&'static str> {
        self.mnemonic.words().collect()
    }

    /// The full phrase, space-separated
    ///
    /// Only for display to the user. Never log or store.
    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }
}

// ============================================================================
// SEAL / RECOVER
// ============================================================================

/// Deterministically derive the recovery key pair from a code
///
/// The same code and global salt always produce the same pair; this is
/// what makes recovery possible from the code alone.
pub fn derive_recovery_keypair(code: &str, global_salt: &GlobalSalt) -> Result<AgreementKeyPair> {
    let code_hash = global_hash(code.as_bytes(), global_salt);
    let seed = hkdf_expand(&code_hash, domain::RECOVERY_SEED_SALT, domain::RECOVERY_SEED)?;
    AgreementKeyPair::from_bytes(&seed)
}

fn envelope_key(shared_secret: &[u8; 32], global_salt: &GlobalSalt) -> Result<EnvelopeKey> {
    let key = hkdf_expand(shared_secret, global_salt.as_bytes(), domain::RECOVERY_ENVELOPE)?;
    Ok(EnvelopeKey::from_bytes(key))
}

/// Seal a password under a recovery code, producing the vault record
///
/// The ephemeral encapsulation pair is generated fresh and its private
/// half is dropped (zeroized) before this function returns.
///
/// ## Errors
///
/// Returns [`Error::InvalidEncoding`] for a password that is empty,
/// longer than 32 bytes, or contains a NUL byte. NUL bytes are rejected
/// because the padded wire form cannot distinguish them from padding.
pub fn seal_password(code: &str, password: &str, global_salt: &GlobalSalt) -> Result<VaultRecord> {
    let password_bytes = password.as_bytes();
    if password_bytes.is_empty() {
        return Err(Error::InvalidEncoding("Password must not be empty".into()));
    }
    if password_bytes.len() > PLAINTEXT_SIZE {
        return Err(Error::InvalidEncoding(format!(
            "Password exceeds {} bytes",
            PLAINTEXT_SIZE
        )));
    }
    if password_bytes.contains(&0) {
        return Err(Error::InvalidEncoding(
            "Password must not contain NUL bytes".into(),
        ));
    }

    let recovery = derive_recovery_keypair(code, global_salt)?;
    let ephemeral = AgreementKeyPair::generate();

    let shared = ephemeral.diffie_hellman(&recovery.public_bytes());
    let key = envelope_key(&shared, global_salt)?;

    let padded = codec::pad_to_32(password_bytes)?;
    let sealed = seal(&key, &padded)?;

    Ok(VaultRecord {
        recovery_public_key: recovery.public_bytes(),
        ct_kem: ephemeral.public_bytes(),
        sealed,
    })
}

/// Read side of the vault: fetches records through the ledger and opens
/// them with a code
pub struct RecoveryVault<L: Ledger> {
    ledger: Arc<L>,
    global_salt: GlobalSalt,
}

impl<L: Ledger> RecoveryVault<L> {
    /// Create a vault reader over a ledger
    pub fn new(ledger: Arc<L>, global_salt: GlobalSalt) -> Self {
        Self {
            ledger,
            global_salt,
        }
    }

    /// Recover the password sealed under a recovery code
    ///
    /// ## Errors
    ///
    /// - [`Error::VaultRecordNotFound`] — no record under the derived
    ///   public key. The code is wrong, or no vault was ever set up.
    /// - [`Error::AuthenticationFailed`] — the record exists but the tag
    ///   did not verify. Tampered record, or a record sealed under a
    ///   different global salt.
    /// - [`Error::CorruptRecord`] — the tag verified but the plaintext
    ///   has the wrong shape. Indicates a defective writer.
    pub async fn recover_password(&self, code: &str) -> Result<String> {
        let keypair = derive_recovery_keypair(code, &self.global_salt)?;
        let lookup_key = codec::to_hex(&keypair.public_bytes());

        let record = self
            .ledger
            .fetch_vault_record(&lookup_key)
            .await?
            .ok_or(Error::VaultRecordNotFound)?;

        let shared = keypair.diffie_hellman(&record.ct_kem);
        let key = envelope_key(&shared, &self.global_salt)?;
        let plaintext = open(&key, &record.sealed)?;

        let padded: [u8; PLAINTEXT_SIZE] = plaintext.as_slice().try_into().map_err(|_| {
            Error::CorruptRecord(format!(
                "Expected {} plaintext bytes, got {}",
                PLAINTEXT_SIZE,
                plaintext.len()
            ))
        })?;
        let password = codec::unpad_32(&padded);
        codec::bytes_to_str(&password)
            .map_err(|_| Error::CorruptRecord("Password is not valid UTF-8".into()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    const CODE: &str = "correct-horse-battery";
    const PASSWORD: &str = "Sup3rSecret!";

    fn salt() -> GlobalSalt {
        GlobalSalt::from_bytes([11u8; 32])
    }

    fn vault_with(record: VaultRecord) -> RecoveryVault<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new(salt()));
        ledger.put_vault_record(record);
        RecoveryVault::new(ledger, salt())
    }

    #[test]
    fn test_recovery_keypair_deterministic() {
        let a = derive_recovery_keypair(CODE, &salt()).unwrap();
        let b = derive_recovery_keypair(CODE, &salt()).unwrap();
        assert_eq!(a.public_bytes(), b.public_bytes());
        assert_eq!(a.secret_bytes(), b.secret_bytes());

        let c = derive_recovery_keypair("other code", &salt()).unwrap();
        assert_ne!(a.public_bytes(), c.public_bytes());

        let d = derive_recovery_keypair(CODE, &GlobalSalt::from_bytes([12u8; 32])).unwrap();
        assert_ne!(a.public_bytes(), d.public_bytes());
    }

    #[tokio::test]
    async fn test_seal_recover_round_trip() {
        let record = seal_password(CODE, PASSWORD, &salt()).unwrap();
        let vault = vault_with(record);

        assert_eq!(vault.recover_password(CODE).await.unwrap(), PASSWORD);
    }

    #[tokio::test]
    async fn test_recover_with_generated_code() {
        let code = RecoveryCode::generate().unwrap();
        assert_eq!(code.words().len(), WORD_COUNT);

        let record = seal_password(&code.phrase(), PASSWORD, &salt()).unwrap();
        let vault = vault_with(record);

        // The user re-enters the phrase; parsing validates the checksum.
        let reentered = RecoveryCode::from_phrase(&code.phrase()).unwrap();
        assert_eq!(
            vault.recover_password(&reentered.phrase()).await.unwrap(),
            PASSWORD
        );
    }

    #[tokio::test]
    async fn test_wrong_code_finds_no_record() {
        let record = seal_password(CODE, PASSWORD, &salt()).unwrap();
        let vault = vault_with(record);

        // A wrong code derives a different public key, so the lookup
        // itself fails. The record is never even fetched.
        assert!(matches!(
            vault.recover_password("wrong code").await,
            Err(Error::VaultRecordNotFound)
        ));
    }

    #[tokio::test]
    async fn test_tampered_record_fails_authentication() {
        let mut record = seal_password(CODE, PASSWORD, &salt()).unwrap();
        record.sealed.ciphertext[0] ^= 0x01;
        let vault = vault_with(record);

        assert!(matches!(
            vault.recover_password(CODE).await,
            Err(Error::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_swapped_kem_key_fails_authentication() {
        let mut record = seal_password(CODE, PASSWORD, &salt()).unwrap();
        record.ct_kem = AgreementKeyPair::generate().public_bytes();
        let vault = vault_with(record);

        assert!(matches!(
            vault.recover_password(CODE).await,
            Err(Error::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_non_utf8_plaintext_is_corrupt() {
        // A defective writer sealed garbage under the right keys.
        let keypair = derive_recovery_keypair(CODE, &salt()).unwrap();
        let ephemeral = AgreementKeyPair::generate();
        let shared = ephemeral.diffie_hellman(&keypair.public_bytes());
        let key = envelope_key(&shared, &salt()).unwrap();
        let mut garbage = [0xffu8; 32];
        garbage[31] = 0xfe; // invalid UTF-8, no trailing padding
        let record = VaultRecord {
            recovery_public_key: keypair.public_bytes(),
            ct_kem: ephemeral.public_bytes(),
            sealed: seal(&key, &garbage).unwrap(),
        };
        let vault = vault_with(record);

        assert!(matches!(
            vault.recover_password(CODE).await,
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_seal_rejects_bad_passwords() {
        let long = "x".repeat(33);
        assert!(matches!(
            seal_password(CODE, &long, &salt()),
            Err(Error::InvalidEncoding(_))
        ));
        assert!(matches!(
            seal_password(CODE, "", &salt()),
            Err(Error::InvalidEncoding(_))
        ));
        assert!(matches!(
            seal_password(CODE, "nul\0byte", &salt()),
            Err(Error::InvalidEncoding(_))
        ));

        // Exactly 32 bytes is the maximum and must work.
        let max = "y".repeat(32);
        assert!(seal_password(CODE, &max, &salt()).is_ok());
    }

    #[tokio::test]
    async fn test_max_length_password_round_trip() {
        let max = "z".repeat(32);
        let record = seal_password(CODE, &max, &salt()).unwrap();
        let vault = vault_with(record);
        assert_eq!(vault.recover_password(CODE).await.unwrap(), max);
    }

    #[test]
    fn test_recovery_code_validation() {
        assert!(matches!(
            RecoveryCode::from_phrase("not a real phrase"),
            Err(Error::InvalidRecoveryCode(_))
        ));

        // Valid words with a deliberately broken checksum
        assert!(RecoveryCode::from_phrase(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
        )
        .is_err());

        // The canonical all-"abandon" test vector has "about" as its
        // checksum word.
        let code = RecoveryCode::from_phrase(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        assert_eq!(code.words().len(), WORD_COUNT);
    }

    #[test]
    fn test_vault_record_wire_format() {
        let record = seal_password(CODE, PASSWORD, &salt()).unwrap();
        let json = serde_json::to_string(&record).unwrap();

        // Sealed-box fields are flattened alongside the keys.
        assert!(json.contains("\"recovery_public_key\":\"0x"));
        assert!(json.contains("\"ct_kem\":\"0x"));
        assert!(json.contains("\"ct\":\"0x"));
        assert!(json.contains("\"tag\":\"0x"));
        assert!(json.contains("\"nonce\":\"0x"));

        let restored: VaultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
