//! # Commitment Engine
//!
//! The commit-protect transaction envelope: the all-or-nothing pattern
//! ensuring the local identity only advances after the ledger confirms
//! the corresponding mutation.
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   COMMIT-PROTECT ENVELOPE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Idle                                                                  │
//! │   │  next_salt       = H2(current_salt, GLOBAL_SALT)                   │
//! │   ▼                                                                     │
//! │  SaltRotated                                                           │
//! │   │  next_proof      = H2(input_data, next_salt)                       │
//! │   ▼                                                                     │
//! │  ProofRecomputed                                                       │
//! │   │  next_commitment = H2(next_proof, GLOBAL_SALT)                     │
//! │   │  commitment_hash = H2(next_commitment, GLOBAL_SALT)                │
//! │   ▼                                                                     │
//! │  CommitmentRecomputed                                                  │
//! │   │  submit(proof, commitment_hash, next_commitment, payload)          │
//! │   │        │                                                           │
//! │   │        ├── ledger accepts ──► RemoteCommitted                      │
//! │   │        │                         │  rotate local identity          │
//! │   │        │                         ▼                                 │
//! │   │        │                      LocalCacheUpdated   (success)        │
//! │   │        │                                                           │
//! │   │        └── any failure ─────► Failed                               │
//! │   │                                  local identity UNCHANGED          │
//! │   ▼                                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1–4 are pure hashing on well-formed input and cannot fail; the
//! ledger submission is the only recoverable failure point. The identity
//! mutex is held for the full envelope, which yields the core guarantee:
//! **at most one commitment rotation per successful ledger mutation** —
//! two concurrent callers can never both read the same `current_salt` and
//! both rotate from it.
//!
//! ## Cancellation
//!
//! Dropping the `commit_protect` future before the submission resolves
//! leaves the identity at its pre-operation value: the rotation is
//! applied strictly after the await returns success. The in-flight ledger
//! call may still land server-side; [`CommitmentEngine::resync`] rolls
//! the local chain forward when a later refresh reveals the ledger is
//! ahead — the ledger is the ultimate source of truth.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::codec;
use crate::crypto::hash::{global_hash, global_hash2, GlobalSalt};
use crate::error::{Error, Result};
use crate::identity::CryptoIdentity;
use crate::ledger::{Ledger, MutationCall, MutationPayload, MutationReceipt};

/// Upper bound on forward rotations attempted during [`CommitmentEngine::resync`]
///
/// A gap wider than this means the local copy does not belong to the
/// remote account at all.
const MAX_RESYNC_ROTATIONS: u32 = 64;

/// Phases of the commit-protect envelope, for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationState {
    /// No mutation in flight
    Idle,
    /// Next salt computed
    SaltRotated,
    /// Next proof computed
    ProofRecomputed,
    /// Next commitment and its binding hash computed
    CommitmentRecomputed,
    /// Ledger accepted the mutation
    RemoteCommitted,
    /// Local identity rotated; terminal success
    LocalCacheUpdated,
    /// Terminal failure; local identity unchanged
    Failed,
}

/// The precomputed next identity state for one mutation
///
/// Pure function of the current identity and the global salt; computing
/// it has no side effects on the identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextState {
    /// `H2(current_salt, GLOBAL_SALT)`
    pub next_salt: [u8; 32],
    /// `H2(input_data, next_salt)`
    pub next_proof: [u8; 32],
    /// `H2(next_proof, GLOBAL_SALT)`
    pub next_commitment: [u8; 32],
    /// `H2(next_commitment, GLOBAL_SALT)` — binds the mutation to this
    /// exact next state before its side effect is accepted
    pub commitment_hash: [u8; 32],
}

impl NextState {
    /// Compute the rotation the given identity would advance to
    pub fn compute(identity: &CryptoIdentity, global_salt: &GlobalSalt) -> Self {
        let next_salt = global_hash(identity.current_salt(), global_salt);
        let next_proof = global_hash2(identity.input_data(), &next_salt);
        let next_commitment = global_hash(&next_proof, global_salt);
        let commitment_hash = global_hash(&next_commitment, global_salt);
        Self {
            next_salt,
            next_proof,
            next_commitment,
            commitment_hash,
        }
    }
}

/// Serializes all mutations against one [`CryptoIdentity`]
///
/// The identity lives behind a `tokio::sync::Mutex` because the lock is
/// held across the ledger await point. One engine (or several clones of
/// the same `Arc`) per identity; mutations through it are strictly
/// ordered.
pub struct CommitmentEngine<L: Ledger> {
    identity: Arc<Mutex<CryptoIdentity>>,
    global_salt: GlobalSalt,
    ledger: Arc<L>,
}

impl<L: Ledger> CommitmentEngine<L> {
    /// Create an engine around a shared identity
    pub fn new(
        identity: Arc<Mutex<CryptoIdentity>>,
        global_salt: GlobalSalt,
        ledger: Arc<L>,
    ) -> Self {
        Self {
            identity,
            global_salt,
            ledger,
        }
    }

    /// Run one mutation through the commit-protect envelope, waiting for
    /// any in-flight mutation to finish first
    ///
    /// ## Errors
    ///
    /// [`Error::LedgerRejected`] (or any validation error) leaves the
    /// identity byte-identical to its pre-call value; the whole operation
    /// may be retried from scratch.
    pub async fn commit_protect(&self, payload: MutationPayload) -> Result<MutationReceipt> {
        let mut identity = self.identity.lock().await;
        self.rotate_locked(&mut identity, payload).await
    }

    /// Like [`CommitmentEngine::commit_protect`], but rejects immediately
    /// when another mutation holds the identity lock
    ///
    /// ## Errors
    ///
    /// [`Error::ConcurrentMutationBlocked`] when the lock is held;
    /// retry after backoff (policy is the caller's).
    pub async fn try_commit_protect(&self, payload: MutationPayload) -> Result<MutationReceipt> {
        let mut identity = self
            .identity
            .try_lock()
            .map_err(|_| Error::ConcurrentMutationBlocked)?;
        self.rotate_locked(&mut identity, payload).await
    }

    async fn rotate_locked(
        &self,
        identity: &mut CryptoIdentity,
        payload: MutationPayload,
    ) -> Result<MutationReceipt> {
        payload.validate()?;

        // Steps 1-4: pure hashing, no failure modes on well-formed state.
        let next = NextState::compute(identity, &self.global_salt);
        tracing::debug!(
            state = ?RotationState::CommitmentRecomputed,
            next_commitment = %codec::to_hex(&next.next_commitment),
            "prepared next commitment state"
        );

        let call = MutationCall {
            proof: codec::to_hex(identity.proof()),
            commitment_hash: codec::to_hex(&next.commitment_hash),
            next_commitment: codec::to_hex(&next.next_commitment),
            payload,
        };

        // Step 5: the only recoverable failure point. The identity is not
        // touched until this resolves successfully; dropping the future
        // here (cancellation) leaves it untouched as well.
        let receipt = match self.ledger.submit_mutation(call).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(state = ?RotationState::Failed, error = %e, "mutation not committed");
                return Err(e);
            }
        };

        // Step 6: advance the local cache.
        identity.apply_rotation(next.next_salt, next.next_proof, next.next_commitment);
        tracing::info!(
            state = ?RotationState::LocalCacheUpdated,
            commitment = %identity.commitment_hex(),
            tx_id = %receipt.tx_id,
            "commitment rotated"
        );
        Ok(receipt)
    }

    /// The identity's current on-chain commitment, `0x`-hex
    pub async fn commitment_hex(&self) -> String {
        self.identity.lock().await.commitment_hex()
    }

    /// A point-in-time copy of the identity, for persistence
    pub async fn snapshot(&self) -> CryptoIdentity {
        self.identity.lock().await.clone()
    }

    /// Reconcile the local identity with the commitment the ledger
    /// reports
    ///
    /// A cancelled commit-protect call may have landed server-side after
    /// the local rotation was abandoned. When a balance/event refresh
    /// reveals a remote commitment ahead of ours, roll the local chain
    /// forward until it matches. Returns the number of rotations applied
    /// (0 when already in sync).
    ///
    /// ## Errors
    ///
    /// [`Error::StorageCorrupted`] if the remote commitment is not
    /// reachable within [`MAX_RESYNC_ROTATIONS`] rotations — the local
    /// copy does not belong to that account.
    pub async fn resync(&self, remote_commitment: &str) -> Result<u32> {
        let mut identity = self.identity.lock().await;
        if identity.commitment_hex() == remote_commitment {
            return Ok(0);
        }

        let mut candidate = identity.clone();
        for rotations in 1..=MAX_RESYNC_ROTATIONS {
            let next = NextState::compute(&candidate, &self.global_salt);
            candidate.apply_rotation(next.next_salt, next.next_proof, next.next_commitment);
            if candidate.commitment_hex() == remote_commitment {
                *identity = candidate;
                tracing::info!(rotations, "local identity resynced to ledger state");
                return Ok(rotations);
            }
        }

        Err(Error::StorageCorrupted(format!(
            "Remote commitment {} not reachable within {} rotations",
            remote_commitment, MAX_RESYNC_ROTATIONS
        )))
    }
}

// Engines over the same identity can be cloned cheaply; the mutex keeps
// their mutations serialized.
impl<L: Ledger> Clone for CommitmentEngine<L> {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
            global_salt: self.global_salt.clone(),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    const TOKEN: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn global_salt() -> GlobalSalt {
        GlobalSalt::from_bytes([11u8; 32])
    }

    fn withdraw(amount: u128) -> MutationPayload {
        MutationPayload::Withdraw {
            recipient: TOKEN.into(),
            token: TOKEN.into(),
            amount,
        }
    }

    /// Engine + ledger with the identity's commitment funded
    fn funded_engine(balance: u128) -> (CommitmentEngine<MemoryLedger>, Arc<MemoryLedger>) {
        let salt = global_salt();
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt);
        let ledger = Arc::new(MemoryLedger::new(salt.clone()));
        ledger.register_account(&identity.commitment_hex(), balance);
        let engine = CommitmentEngine::new(
            Arc::new(Mutex::new(identity)),
            salt,
            Arc::clone(&ledger),
        );
        (engine, ledger)
    }

    #[test]
    fn test_next_state_deterministic() {
        let salt = global_salt();
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt);
        assert_eq!(
            NextState::compute(&identity, &salt),
            NextState::compute(&identity, &salt)
        );
    }

    #[tokio::test]
    async fn test_success_rotates_and_keeps_invariant() {
        let (engine, ledger) = funded_engine(1000);
        let before = engine.snapshot().await;

        engine.commit_protect(withdraw(300)).await.unwrap();

        let after = engine.snapshot().await;
        assert_ne!(before.commitment(), after.commitment());
        assert_ne!(before.proof(), after.proof());
        assert_ne!(before.current_salt(), after.current_salt());
        assert!(after.verify_invariant(&global_salt()));

        assert_eq!(ledger.balance_of(&after.commitment_hex()).await.unwrap(), 700);
    }

    #[tokio::test]
    async fn test_failure_leaves_identity_byte_identical() {
        let (engine, ledger) = funded_engine(1000);
        ledger.set_reject_mutations(true);

        let before = engine.snapshot().await;
        let result = engine.commit_protect(withdraw(300)).await;
        assert!(matches!(result, Err(Error::LedgerRejected(_))));

        assert_eq!(engine.snapshot().await, before);

        // Retry from the same Idle state once the ledger recovers.
        ledger.set_reject_mutations(false);
        engine.commit_protect(withdraw(300)).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_payload_leaves_identity_unchanged() {
        let (engine, _ledger) = funded_engine(1000);
        let before = engine.snapshot().await;

        assert!(engine.commit_protect(withdraw(0)).await.is_err());
        assert_eq!(engine.snapshot().await, before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_serialize() {
        const N: usize = 10;
        let (engine, _ledger) = funded_engine(10_000);
        let initial = engine.snapshot().await;

        let mut handles = Vec::new();
        for _ in 0..N {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.commit_protect(withdraw(100)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Exactly N sequential rotations: the final commitment must match
        // the N-fold iterated rotation from the initial state. Any lost
        // race (two callers rotating from the same salt) would land
        // elsewhere.
        let salt = global_salt();
        let mut expected = initial;
        for _ in 0..N {
            let next = NextState::compute(&expected, &salt);
            expected.apply_rotation(next.next_salt, next.next_proof, next.next_commitment);
        }
        assert_eq!(engine.snapshot().await, expected);
    }

    #[tokio::test]
    async fn test_try_commit_protect_rejects_while_locked() {
        let (engine, _ledger) = funded_engine(1000);

        // Hold the identity lock, simulating an in-flight mutation.
        let guard = engine.identity.lock().await;
        let result = engine.try_commit_protect(withdraw(100)).await;
        assert!(matches!(result, Err(Error::ConcurrentMutationBlocked)));
        drop(guard);

        engine.try_commit_protect(withdraw(100)).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_leaves_identity_unchanged() {
        let (engine, ledger) = funded_engine(1000);
        ledger.set_submit_delay_ms(5_000);

        let before = engine.snapshot().await;
        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.commit_protect(withdraw(100)).await })
        };
        // Let the task reach the submission await, then cancel it.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        task.abort();
        assert!(task.await.is_err());

        assert_eq!(engine.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_resync_rolls_forward_to_remote_state() {
        let salt = global_salt();
        let identity = CryptoIdentity::derive("alice", "hunter2", [1u8; 32], &salt);

        // The ledger accepted two rotations the local copy never applied.
        let mut remote = identity.clone();
        for _ in 0..2 {
            let next = NextState::compute(&remote, &salt);
            remote.apply_rotation(next.next_salt, next.next_proof, next.next_commitment);
        }

        let ledger = Arc::new(MemoryLedger::new(salt.clone()));
        let engine =
            CommitmentEngine::new(Arc::new(Mutex::new(identity)), salt.clone(), ledger);

        assert_eq!(engine.resync(&remote.commitment_hex()).await.unwrap(), 2);
        let local = engine.snapshot().await;
        assert_eq!(local, remote);
        assert!(local.verify_invariant(&salt));

        // Already in sync: no rotations applied.
        assert_eq!(engine.resync(&remote.commitment_hex()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resync_rejects_foreign_commitment() {
        let (engine, _ledger) = funded_engine(0);
        let result = engine.resync(&codec::to_hex(&[0xee; 32])).await;
        assert!(matches!(result, Err(Error::StorageCorrupted(_))));
    }
}
