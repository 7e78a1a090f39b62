//! # VeilPay Core
//!
//! The commitment and recovery engine for a P2P stablecoin mobile
//! wallet. Accounts are not keypairs: an account is a rotating
//! hash-chain commitment derived from the user's credentials, advanced
//! in lock-step with every balance mutation the ledger accepts.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        VEILPAY CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  Identity   │  │   Engine    │  │  Recovery   │  │    Ledger    │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Derive    │  │ - Commit-   │  │ - Seal pw   │  │ - Mutations  │   │
//! │  │ - Rotate    │  │   protect   │  │ - Recover   │  │ - Balances   │   │
//! │  │ - Verify    │  │ - Resync    │  │ - BIP39     │  │ - Vault      │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────────────┴────────────────┘           │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌─────────────┐ │ ┌─────────────────────────────────┐│
//! │  │   Crypto    │  │   Storage   │ │ │          WalletSession          ││
//! │  │             │  │             │ │ │                                 ││
//! │  │ - Keccak    │  │ - Secure    │◄┘ │ - create_account / login       ││
//! │  │ - X25519    │  │   store     │   │ - withdraw / claim / balance   ││
//! │  │ - AES-GCM   │  │ - Snapshot  │   │ - recovery setup + recover     ││
//! │  └─────────────┘  └─────────────┘   └─────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`codec`] - Hex/byte conversion, padding, secure random
//! - [`crypto`] - Cryptographic primitives (hash chain, keys, envelopes)
//! - [`config`] - Per-deployment bootstrap parameters
//! - [`identity`] - The rotating commitment identity
//! - [`engine`] - The commit-protect transaction envelope
//! - [`recovery`] - Password recovery vault and recovery codes
//! - [`ledger`] - The remote ledger collaborator trait
//! - [`storage`] - Secure persistence for the identity snapshot
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Credential Hiding (Keccak-256 hash chain)                    │
//! │  ──────────────────────────────────────────────────                     │
//! │  The ledger only ever sees commitment = H(H(credentials ‖ salt) ‖      │
//! │  GLOBAL_SALT). Credentials never leave the device.                     │
//! │                                                                         │
//! │  Layer 2: Replay Resistance (commitment rotation)                      │
//! │  ────────────────────────────────────────────────                       │
//! │  Every accepted mutation rotates the salt, so an observed proof        │
//! │  authorizes exactly one mutation and is worthless afterwards.          │
//! │                                                                         │
//! │  Layer 3: Atomicity (commit-protect envelope)                          │
//! │  ────────────────────────────────────────────                           │
//! │  The local identity advances only after the ledger confirms; any       │
//! │  failure or cancellation leaves it byte-identical.                     │
//! │                                                                         │
//! │  Layer 4: Recovery (X25519 + HKDF + AES-256-GCM vault)                 │
//! │  ──────────────────────────────────────────────────────                 │
//! │  The password is sealed on-ledger under a key only the recovery        │
//! │  code can re-derive. Losing the device loses nothing.                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod codec;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod recovery;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::BootstrapConfig;
pub use crypto::{AgreementKeyPair, GlobalSalt, SealedBox};
pub use engine::{CommitmentEngine, NextState};
pub use error::{Error, Result};
pub use identity::CryptoIdentity;
pub use ledger::{Ledger, MemoryLedger, MutationPayload, MutationReceipt};
pub use recovery::{RecoveryCode, RecoveryVault, VaultRecord};
pub use storage::{MemorySecureStore, SecureStore};

// ============================================================================
// WALLET SESSION
// ============================================================================

use std::sync::Arc;

use tokio::sync::Mutex;

/// The top-level session facade the app layer talks to
///
/// Owns the engine for the active identity and wires together the
/// ledger, secure store, and bootstrap config. One session per process;
/// all mutating operations funnel through the engine's commit-protect
/// envelope.
pub struct WalletSession<L: Ledger, S: SecureStore + ?Sized> {
    config: BootstrapConfig,
    ledger: Arc<L>,
    store: Arc<S>,
    engine: parking_lot::RwLock<Option<CommitmentEngine<L>>>,
}

impl<L: Ledger, S: SecureStore + ?Sized> WalletSession<L, S> {
    /// Create a session from a validated bootstrap config
    ///
    /// If a persisted identity snapshot exists, it is loaded and the
    /// session starts logged in.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::ConfigInvalid`] for a bad config and
    /// [`Error::StorageCorrupted`] for an unparsable snapshot.
    pub fn new(config: BootstrapConfig, ledger: Arc<L>, store: Arc<S>) -> Result<Self> {
        config.validate()?;
        let engine = storage::load_identity(store.as_ref())?.map(|identity| {
            CommitmentEngine::new(
                Arc::new(Mutex::new(identity)),
                config.global_salt.clone(),
                Arc::clone(&ledger),
            )
        });
        Ok(Self {
            config,
            ledger,
            store,
            engine: parking_lot::RwLock::new(engine),
        })
    }

    /// Whether an identity is loaded
    pub fn is_logged_in(&self) -> bool {
        self.engine.read().is_some()
    }

    /// The engine for the active identity
    ///
    /// ## Errors
    ///
    /// Returns [`Error::NoIdentity`] when logged out.
    pub fn engine(&self) -> Result<CommitmentEngine<L>> {
        self.engine.read().clone().ok_or(Error::NoIdentity)
    }

    /// Create a fresh account with a random initial salt
    ///
    /// Derives the identity, persists its snapshot, and returns the
    /// initial on-chain commitment (`0x`-hex) for the app to register
    /// with the ledger.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::IdentityExists`] if an identity is already
    /// loaded or persisted.
    pub fn create_account(&self, username: &str, password: &str) -> Result<String> {
        if self.is_logged_in() || self.store.exists(storage::keys::IDENTITY)? {
            return Err(Error::IdentityExists);
        }

        let initial_salt: [u8; 32] = codec::random_bytes(32)
            .try_into()
            .map_err(|_| Error::KeyDerivationFailed("Salt generation failed".into()))?;
        let identity =
            CryptoIdentity::derive(username, password, initial_salt, &self.config.global_salt);
        let commitment = identity.commitment_hex();
        storage::persist_identity(self.store.as_ref(), &identity)?;

        *self.engine.write() = Some(CommitmentEngine::new(
            Arc::new(Mutex::new(identity)),
            self.config.global_salt.clone(),
            Arc::clone(&self.ledger),
        ));
        tracing::info!(commitment = %commitment, "account created");
        Ok(commitment)
    }

    /// Log in against the persisted identity snapshot
    ///
    /// ## Errors
    ///
    /// - [`Error::NoIdentity`] — nothing persisted on this device.
    /// - [`Error::InvalidCredentials`] — snapshot exists but was derived
    ///   from different credentials.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let identity =
            storage::load_identity(self.store.as_ref())?.ok_or(Error::NoIdentity)?;
        if !identity.matches_credentials(username, password) {
            return Err(Error::InvalidCredentials);
        }
        let commitment = identity.commitment_hex();
        *self.engine.write() = Some(CommitmentEngine::new(
            Arc::new(Mutex::new(identity)),
            self.config.global_salt.clone(),
            Arc::clone(&self.ledger),
        ));
        tracing::info!(commitment = %commitment, "logged in");
        Ok(())
    }

    /// Drop the in-memory identity; the persisted snapshot stays
    ///
    /// The identity zeroizes when its last reference drops.
    pub fn logout(&self) {
        *self.engine.write() = None;
        tracing::info!("logged out");
    }

    /// Log out and delete the persisted snapshot
    ///
    /// After this, only the recovery flow can restore access on this
    /// device.
    pub fn wipe(&self) -> Result<()> {
        self.logout();
        storage::delete_identity(self.store.as_ref())
    }

    /// Generate a recovery code and seal the password under it
    ///
    /// Credentials are re-checked against the active identity so a vault
    /// record can never be sealed for a password that does not match the
    /// account. The returned [`VaultRecord`] must be published on-chain
    /// by the app's submission path; the code must be shown to the user
    /// exactly once.
    pub fn setup_recovery(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(RecoveryCode, VaultRecord)> {
        if !self.is_logged_in() {
            return Err(Error::NoIdentity);
        }
        // Synchronous check against the snapshot; the live identity is
        // only reachable through the engine's async lock.
        let identity = storage::load_identity(self.store.as_ref())?.ok_or(Error::NoIdentity)?;
        if !identity.matches_credentials(username, password) {
            return Err(Error::InvalidCredentials);
        }

        let code = RecoveryCode::generate()?;
        let record = recovery::seal_password(&code.phrase(), password, &self.config.global_salt)?;
        Ok((code, record))
    }

    /// Recover the account password from a recovery code
    pub async fn recover_password(&self, code: &str) -> Result<String> {
        let vault = RecoveryVault::new(Arc::clone(&self.ledger), self.config.global_salt.clone());
        vault.recover_password(code).await
    }

    /// The balance held under the current commitment
    pub async fn balance(&self) -> Result<u128> {
        let engine = self.engine()?;
        let commitment = engine.commitment_hex().await;
        self.ledger.balance_of(&commitment).await
    }

    /// Withdraw funds to a recipient through the commit-protect envelope
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidAmount`] below the configured minimum.
    /// Every ledger-side failure leaves the identity untouched and
    /// retryable.
    pub async fn withdraw(&self, recipient: &str, amount: u128) -> Result<MutationReceipt> {
        if amount < self.config.min_amount {
            return Err(Error::InvalidAmount(format!(
                "Amount {} below minimum {}",
                amount, self.config.min_amount
            )));
        }
        self.mutate(MutationPayload::Withdraw {
            recipient: recipient.to_string(),
            token: self.config.token_address.clone(),
            amount,
        })
        .await
    }

    /// Claim funds sent to this commitment
    pub async fn claim(&self, amount: u128) -> Result<MutationReceipt> {
        self.mutate(MutationPayload::Claim {
            token: self.config.token_address.clone(),
            amount,
        })
        .await
    }

    /// Fold an observed deposit into the balance
    pub async fn acknowledge_deposit(&self, amount: u128) -> Result<MutationReceipt> {
        self.mutate(MutationPayload::DepositAck {
            token: self.config.token_address.clone(),
            amount,
        })
        .await
    }

    /// Reconcile the local identity with the commitment the ledger
    /// reports, then persist the result
    pub async fn resync(&self, remote_commitment: &str) -> Result<u32> {
        let engine = self.engine()?;
        let rotations = engine.resync(remote_commitment).await?;
        if rotations > 0 {
            storage::persist_identity(self.store.as_ref(), &engine.snapshot().await)?;
        }
        Ok(rotations)
    }

    async fn mutate(&self, payload: MutationPayload) -> Result<MutationReceipt> {
        let engine = self.engine()?;
        let receipt = engine.commit_protect(payload).await?;
        // The snapshot must track the rotated state or a device restart
        // would resurrect a stale proof.
        storage::persist_identity(self.store.as_ref(), &engine.snapshot().await)?;
        Ok(receipt)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn config() -> BootstrapConfig {
        BootstrapConfig::from_json(&format!(
            r#"{{"global_salt": "0x{}", "min_amount": 10, "token_address": "{}"}}"#,
            "0b".repeat(32),
            TOKEN
        ))
        .unwrap()
    }

    fn session() -> (
        WalletSession<MemoryLedger, MemorySecureStore>,
        Arc<MemoryLedger>,
    ) {
        let config = config();
        let ledger = Arc::new(MemoryLedger::new(config.global_salt.clone()));
        let store = Arc::new(MemorySecureStore::new());
        let session = WalletSession::new(config, Arc::clone(&ledger), store).unwrap();
        (session, ledger)
    }

    #[tokio::test]
    async fn test_account_lifecycle() {
        let (session, ledger) = session();
        assert!(!session.is_logged_in());
        assert!(matches!(session.engine(), Err(Error::NoIdentity)));

        let commitment = session.create_account("alice", "hunter2").unwrap();
        assert!(session.is_logged_in());
        assert!(matches!(
            session.create_account("bob", "pw"),
            Err(Error::IdentityExists)
        ));

        ledger.register_account(&commitment, 1000);
        assert_eq!(session.balance().await.unwrap(), 1000);

        session.logout();
        assert!(!session.is_logged_in());

        assert!(matches!(
            session.login("alice", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        session.login("alice", "hunter2").unwrap();
        assert_eq!(session.balance().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_withdraw_rotates_and_persists() {
        let (session, ledger) = session();
        let initial = session.create_account("alice", "hunter2").unwrap();
        ledger.register_account(&initial, 1000);

        assert!(matches!(
            session.withdraw(TOKEN, 5).await,
            Err(Error::InvalidAmount(_))
        ));

        session.withdraw(TOKEN, 300).await.unwrap();
        let rotated = session.engine().unwrap().commitment_hex().await;
        assert_ne!(rotated, initial);
        assert_eq!(session.balance().await.unwrap(), 700);

        // The persisted snapshot tracks the rotation: a fresh login sees
        // the rotated state.
        session.logout();
        session.login("alice", "hunter2").unwrap();
        assert_eq!(session.engine().unwrap().commitment_hex().await, rotated);
        assert_eq!(session.balance().await.unwrap(), 700);
    }

    #[tokio::test]
    async fn test_claim_and_deposit_ack() {
        let (session, ledger) = session();
        let initial = session.create_account("alice", "hunter2").unwrap();
        ledger.register_account(&initial, 100);

        session.claim(50).await.unwrap();
        assert_eq!(session.balance().await.unwrap(), 150);

        session.acknowledge_deposit(25).await.unwrap();
        assert_eq!(session.balance().await.unwrap(), 175);
    }

    #[tokio::test]
    async fn test_recovery_flow_end_to_end() {
        let (session, ledger) = session();
        session.create_account("alice", "hunter2").unwrap();

        assert!(matches!(
            session.setup_recovery("alice", "wrong"),
            Err(Error::InvalidCredentials)
        ));

        let (code, record) = session.setup_recovery("alice", "hunter2").unwrap();
        ledger.put_vault_record(record);

        assert_eq!(
            session.recover_password(&code.phrase()).await.unwrap(),
            "hunter2"
        );
        assert!(matches!(
            session.recover_password("wrong code").await,
            Err(Error::VaultRecordNotFound)
        ));
    }

    #[tokio::test]
    async fn test_session_restores_persisted_identity() {
        let config = config();
        let ledger = Arc::new(MemoryLedger::new(config.global_salt.clone()));
        let store = Arc::new(MemorySecureStore::new());

        let commitment = {
            let session =
                WalletSession::new(config.clone(), Arc::clone(&ledger), Arc::clone(&store))
                    .unwrap();
            session.create_account("alice", "hunter2").unwrap()
        };

        // A new session over the same store starts logged in.
        let session = WalletSession::new(config, ledger, store).unwrap();
        assert!(session.is_logged_in());
        assert_eq!(session.engine().unwrap().commitment_hex().await, commitment);
    }

    #[tokio::test]
    async fn test_wipe_deletes_snapshot() {
        let (session, _ledger) = session();
        session.create_account("alice", "hunter2").unwrap();
        session.wipe().unwrap();

        assert!(!session.is_logged_in());
        assert!(matches!(
            session.login("alice", "hunter2"),
            Err(Error::NoIdentity)
        ));
        // The slot is free again.
        session.create_account("alice", "hunter2").unwrap();
    }
}
