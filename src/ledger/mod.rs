//! # Ledger Collaborator
//!
//! The boundary to the remote ledger/RPC layer. This core has no wire
//! format of its own beyond the values it produces here: every byte value
//! crossing the trait is a lowercase `0x`-prefixed hex string of fixed
//! length (32 bytes ⇒ 64 hex chars, addresses ⇒ 40 hex chars).
//!
//! The trait is intentionally narrow:
//!
//! - `submit_mutation` — the balance-mutating call, carrying the current
//!   `proof` as authorization and the `commitment_hash`/`next_commitment`
//!   the ledger should advance to.
//! - `balance_of` — balance query by 32-byte commitment.
//! - `fetch_vault_record` — recovery vault lookup by 32-byte public key.
//!
//! [`MemoryLedger`] is an in-memory reference implementation for
//! development and testing. It performs the same proof check the on-chain
//! verifier does, which makes stale-proof replays fail in tests exactly
//! as they would on-chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::crypto::hash::{global_hash, GlobalSalt};
use crate::error::{Error, Result};
use crate::recovery::VaultRecord;

/// The balance-mutating operation bound to a commitment rotation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationPayload {
    /// Transfer funds out to a recipient address
    Withdraw {
        /// Recipient address (checksummed or uniform-case hex)
        recipient: String,
        /// Token contract address
        token: String,
        /// Amount in the token's smallest unit
        amount: u128,
    },
    /// Claim funds previously sent to this commitment
    Claim {
        /// Token contract address
        token: String,
        /// Amount in the token's smallest unit
        amount: u128,
    },
    /// Acknowledge an observed deposit, folding it into the balance
    DepositAck {
        /// Token contract address
        token: String,
        /// Amount in the token's smallest unit
        amount: u128,
    },
}

impl MutationPayload {
    /// The amount this mutation moves
    pub fn amount(&self) -> u128 {
        match self {
            MutationPayload::Withdraw { amount, .. }
            | MutationPayload::Claim { amount, .. }
            | MutationPayload::DepositAck { amount, .. } => *amount,
        }
    }

    /// Validate the payload shape before submission
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidAmount`] for a zero amount and
    /// [`Error::InvalidEncoding`] for a malformed recipient or token
    /// address.
    pub fn validate(&self) -> Result<()> {
        if self.amount() == 0 {
            return Err(Error::InvalidAmount("Amount must be positive".into()));
        }
        let (recipient, token) = match self {
            MutationPayload::Withdraw { recipient, token, .. } => (Some(recipient), token),
            MutationPayload::Claim { token, .. } | MutationPayload::DepositAck { token, .. } => {
                (None, token)
            }
        };
        if let Some(recipient) = recipient {
            if !codec::is_address(recipient) {
                return Err(Error::InvalidEncoding(format!(
                    "Invalid recipient address: {}",
                    recipient
                )));
            }
        }
        if !codec::is_address(token) {
            return Err(Error::InvalidEncoding(format!(
                "Invalid token address: {}",
                token
            )));
        }
        Ok(())
    }
}

/// A fully prepared mutating call
///
/// `proof` authorizes the mutation against the current commitment;
/// `commitment_hash` binds the mutation to the exact next state before
/// the side effect is accepted; `next_commitment` is the state the ledger
/// advances to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MutationCall {
    /// Current proof, `0x`-hex (authorization)
    pub proof: String,
    /// `H2(next_commitment, GLOBAL_SALT)`, `0x`-hex (pre-image binding)
    pub commitment_hash: String,
    /// The commitment the ledger should advance to, `0x`-hex
    pub next_commitment: String,
    /// The value-moving operation itself
    pub payload: MutationPayload,
}

/// Acknowledgement of an accepted mutation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MutationReceipt {
    /// Ledger transaction identifier, `0x`-hex
    pub tx_id: String,
}

/// The remote ledger/RPC collaborator
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a balance-mutating call
    ///
    /// ## Errors
    ///
    /// Returns [`Error::LedgerRejected`] on network failure,
    /// authorization mismatch, or contract rejection. The caller's local
    /// identity is guaranteed untouched in every error case.
    async fn submit_mutation(&self, call: MutationCall) -> Result<MutationReceipt>;

    /// Query the balance held under a commitment (`0x`-hex, 32 bytes)
    async fn balance_of(&self, commitment: &str) -> Result<u128>;

    /// Fetch the recovery vault record keyed by a recovery public key
    /// (`0x`-hex, 32 bytes), or `None` if absent
    async fn fetch_vault_record(&self, recovery_pk: &str) -> Result<Option<VaultRecord>>;
}

// ============================================================================
// IN-MEMORY REFERENCE LEDGER
// ============================================================================

/// In-memory ledger for development and testing
///
/// Replays the on-chain verifier's check: a mutation is accepted only if
/// `H2(proof, GLOBAL_SALT)` equals a commitment currently holding a
/// balance, and the balance moves to `next_commitment`. A stale proof —
/// one whose commitment was already rotated away — is rejected, exactly
/// as the contract would reject it.
pub struct MemoryLedger {
    global_salt: GlobalSalt,
    /// commitment hex → balance
    accounts: RwLock<HashMap<String, u128>>,
    /// recovery public key hex → vault record
    vault_records: RwLock<HashMap<String, VaultRecord>>,
    /// When set, every submission fails with `LedgerRejected`
    reject_mutations: AtomicBool,
    /// Artificial latency before a submission is processed, for
    /// cancellation tests
    submit_delay_ms: AtomicU64,
}

impl MemoryLedger {
    /// Create an empty ledger bound to a global salt
    pub fn new(global_salt: GlobalSalt) -> Self {
        Self {
            global_salt,
            accounts: RwLock::new(HashMap::new()),
            vault_records: RwLock::new(HashMap::new()),
            reject_mutations: AtomicBool::new(false),
            submit_delay_ms: AtomicU64::new(0),
        }
    }

    /// Seed a commitment with a balance
    pub fn register_account(&self, commitment: &str, balance: u128) {
        self.accounts.write().insert(commitment.to_string(), balance);
    }

    /// Store a vault record under its recovery public key
    pub fn put_vault_record(&self, record: VaultRecord) {
        let key = codec::to_hex(&record.recovery_public_key);
        self.vault_records.write().insert(key, record);
    }

    /// Toggle unconditional rejection of submissions
    pub fn set_reject_mutations(&self, reject: bool) {
        self.reject_mutations.store(reject, Ordering::SeqCst);
    }

    /// Delay each submission by `ms` milliseconds
    pub fn set_submit_delay_ms(&self, ms: u64) {
        self.submit_delay_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn submit_mutation(&self, call: MutationCall) -> Result<MutationReceipt> {
        let delay = self.submit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.reject_mutations.load(Ordering::SeqCst) {
            return Err(Error::LedgerRejected("Mutations disabled".into()));
        }

        call.payload.validate()?;

        let proof: [u8; 32] = codec::to_bytes(&call.proof)?
            .try_into()
            .map_err(|_| Error::LedgerRejected("Proof must be 32 bytes".into()))?;

        // The verifier's check: the submitted proof must hash to a live
        // commitment.
        let commitment = codec::to_hex(&global_hash(&proof, &self.global_salt));

        let mut accounts = self.accounts.write();
        let balance = accounts
            .remove(&commitment)
            .ok_or_else(|| Error::LedgerRejected("Unknown or stale proof".into()))?;

        let next_balance = match &call.payload {
            MutationPayload::Withdraw { amount, .. } => {
                if *amount > balance {
                    accounts.insert(commitment, balance);
                    return Err(Error::LedgerRejected("Insufficient balance".into()));
                }
                balance - amount
            }
            MutationPayload::Claim { amount, .. }
            | MutationPayload::DepositAck { amount, .. } => balance + amount,
        };
        accounts.insert(call.next_commitment.clone(), next_balance);

        Ok(MutationReceipt {
            tx_id: codec::to_hex(&codec::random_bytes(32)),
        })
    }

    async fn balance_of(&self, commitment: &str) -> Result<u128> {
        Ok(self.accounts.read().get(commitment).copied().unwrap_or(0))
    }

    async fn fetch_vault_record(&self, recovery_pk: &str) -> Result<Option<VaultRecord>> {
        Ok(self.vault_records.read().get(recovery_pk).cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================
